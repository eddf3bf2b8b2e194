//! MS-015: Build constraints and GOOS/GOARCH file name suffixes.
//!
//! A file takes part in the build only when its name suffix (`_linux.go`,
//! `_windows_amd64.go`) and its header constraints (`//go:build`, or the
//! legacy `// +build` lines when no `//go:build` line exists) are satisfied
//! by the target platform.

/// Operating systems the Go toolchain knows.
pub const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

/// Architectures the Go toolchain knows.
pub const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

/// Operating systems satisfying the `unix` tag.
pub const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Newest `go1.N` release tag considered satisfied.
pub const MAX_GO_MINOR: u32 = 24;

/// Platform a package is selected for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    pub cgo: bool,
    /// Extra tags, as with `go build -tags`
    pub tags: Vec<String>,
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::host()
    }
}

impl BuildContext {
    pub fn new(goos: impl Into<String>, goarch: impl Into<String>) -> Self {
        Self {
            goos: goos.into(),
            goarch: goarch.into(),
            cgo: true,
            tags: Vec::new(),
        }
    }

    /// The running platform, overridden by `GOOS`, `GOARCH` and
    /// `CGO_ENABLED` the way the go command reads them.
    pub fn host() -> Self {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let mut ctx = Self::new(
            env("GOOS").unwrap_or_else(|| host_os().to_string()),
            env("GOARCH").unwrap_or_else(|| host_arch().to_string()),
        );
        ctx.cgo = env("CGO_ENABLED").as_deref() != Some("0");
        ctx
    }

    pub fn matches_tag(&self, tag: &str) -> bool {
        let goos = self.goos.as_str();
        tag == goos
            || tag == self.goarch
            || tag == "gc"
            || (tag == "unix" && UNIX_OS.contains(&goos))
            || (tag == "linux" && goos == "android")
            || (tag == "solaris" && goos == "illumos")
            || (tag == "darwin" && goos == "ios")
            || (tag == "cgo" && self.cgo)
            || is_release_tag(tag)
            || self.tags.iter().any(|t| t == tag)
    }

    /// Whether a `_GOOS`, `_GOARCH` or `_GOOS_GOARCH` name suffix allows the file.
    pub fn matches_file_name(&self, name: &str) -> bool {
        let stem = name.strip_suffix(".go").unwrap_or(name);
        let stem = stem.strip_suffix("_test").unwrap_or(stem);
        let Some(first) = stem.find('_') else {
            return true;
        };
        let parts: Vec<&str> = stem[first..].split('_').collect();
        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches_tag(parts[n - 2]) && self.matches_tag(parts[n - 1]);
        }
        let last = parts[n - 1];
        if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
            return self.matches_tag(last);
        }
        true
    }

    /// Evaluate a file's header constraint lines.
    ///
    /// A `//go:build` line wins over `// +build` lines. Legacy lines are
    /// ANDed together; within one, spaces separate alternatives and commas
    /// join terms.
    pub fn matches_constraints<'a>(
        &self,
        lines: impl IntoIterator<Item = &'a str>,
    ) -> Result<bool, String> {
        let mut legacy = Vec::new();
        for line in lines {
            if let Some(expr) = line.strip_prefix("//go:build") {
                return self.eval(expr);
            }
            if let Some(expr) = line.strip_prefix("// +build") {
                legacy.push(expr);
            }
        }
        Ok(legacy.into_iter().all(|expr| self.eval_legacy(expr)))
    }

    /// Evaluate a `//go:build` expression (`||`, `&&`, `!`, parentheses).
    pub fn eval(&self, expr: &str) -> Result<bool, String> {
        let tokens = tokenize(expr)?;
        if tokens.is_empty() {
            return Err("empty //go:build expression".to_string());
        }
        let mut parser = ExprParser {
            ctx: self,
            tokens: &tokens,
            pos: 0,
        };
        let value = parser.or()?;
        match tokens.get(parser.pos) {
            None => Ok(value),
            Some(tok) => Err(format!("unexpected {} in //go:build expression", tok)),
        }
    }

    fn eval_legacy(&self, expr: &str) -> bool {
        expr.split_whitespace().any(|option| {
            option.split(',').all(|term| match term.strip_prefix('!') {
                Some(tag) => !tag.is_empty() && !tag.starts_with('!') && !self.matches_tag(tag),
                None => self.matches_tag(term),
            })
        })
    }
}

fn is_release_tag(tag: &str) -> bool {
    tag.strip_prefix("go1.")
        .and_then(|minor| minor.parse::<u32>().ok())
        .is_some_and(|minor| minor <= MAX_GO_MINOR)
}

fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

fn host_arch() -> &'static str {
    let little = cfg!(target_endian = "little");
    match std::env::consts::ARCH {
        "x86" => "386",
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" if little => "ppc64le",
        "powerpc64" => "ppc64",
        "mips" if little => "mipsle",
        "mips64" if little => "mips64le",
        "wasm32" => "wasm",
        other => other,
    }
}

fn tokenize(expr: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '(' | ')' | '!' => {
                chars.next();
                tokens.push(c.to_string());
            }
            '&' | '|' => {
                chars.next();
                if chars.next() != Some(c) {
                    return Err(format!("invalid operator {} in //go:build expression", c));
                }
                tokens.push(format!("{c}{c}"));
            }
            _ if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut tag = String::new();
                while let Some(&c) = chars.peek() {
                    if !(c.is_alphanumeric() || c == '_' || c == '.') {
                        break;
                    }
                    tag.push(c);
                    chars.next();
                }
                tokens.push(tag);
            }
            _ => return Err(format!("invalid character {:?} in //go:build expression", c)),
        }
    }
    Ok(tokens)
}

struct ExprParser<'a> {
    ctx: &'a BuildContext,
    tokens: &'a [String],
    pos: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn or(&mut self) -> Result<bool, String> {
        let mut value = self.and()?;
        while self.peek() == Some("||") {
            self.pos += 1;
            let rhs = self.and()?;
            value = value || rhs;
        }
        Ok(value)
    }

    fn and(&mut self) -> Result<bool, String> {
        let mut value = self.not()?;
        while self.peek() == Some("&&") {
            self.pos += 1;
            let rhs = self.not()?;
            value = value && rhs;
        }
        Ok(value)
    }

    fn not(&mut self) -> Result<bool, String> {
        match self.peek() {
            Some("!") => {
                self.pos += 1;
                Ok(!self.not()?)
            }
            Some("(") => {
                self.pos += 1;
                let value = self.or()?;
                if self.peek() != Some(")") {
                    return Err("missing ) in //go:build expression".to_string());
                }
                self.pos += 1;
                Ok(value)
            }
            Some(op @ (")" | "&&" | "||")) => {
                Err(format!("unexpected {} in //go:build expression", op))
            }
            Some(tag) => {
                let value = self.ctx.matches_tag(tag);
                self.pos += 1;
                Ok(value)
            }
            None => Err("unexpected end of //go:build expression".to_string()),
        }
    }
}
