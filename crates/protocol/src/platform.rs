/// Extensions of scripts that exist mainly to target one shell family.
pub const SHELL_SCRIPT_EXTENSIONS: &[&str] = &[".sh", ".bash", ".zsh", ".bat", ".cmd", ".ps1"];

const POSIX_PREFERRED: &[&str] = &[".sh", ".bash", ".zsh"];
const WINDOWS_PREFERRED: &[&str] = &[".bat", ".cmd", ".ps1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    pub fn preferred_extensions(self) -> &'static [&'static str] {
        match self {
            Self::Posix => POSIX_PREFERRED,
            Self::Windows => WINDOWS_PREFERRED,
        }
    }

    /// `ext` is lowercase with its leading dot, as returned by [`extension`].
    pub fn prefers(self, ext: &str) -> bool {
        self.preferred_extensions().contains(&ext)
    }

    /// Extension the host can execute directly, if any.
    pub fn native_executable_extension(self) -> Option<&'static str> {
        match self {
            Self::Posix => None,
            Self::Windows => Some(".exe"),
        }
    }
}

pub fn is_shell_script_extension(ext: &str) -> bool {
    SHELL_SCRIPT_EXTENSIONS.contains(&ext)
}

/// Final `/`-separated component of a gist file name.
pub fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Lowercased extension including the dot (`".sh"`), or `""`.
///
/// A leading dot counts, so `.bashrc` has extension `.bashrc` and an empty stem.
pub fn extension(name: &str) -> String {
    let base = base_name(name);
    match base.rfind('.') {
        Some(pos) => base[pos..].to_ascii_lowercase(),
        None => String::new(),
    }
}

pub fn stem(name: &str) -> &str {
    let base = base_name(name);
    match base.rfind('.') {
        Some(pos) => &base[..pos],
        None => base,
    }
}

/// Case-insensitive match of `target` against a file's stem or full base name.
///
/// `target` must already be trimmed and lowercased.
pub fn filename_matches(target: &str, filename: &str) -> bool {
    if target.is_empty() {
        return false;
    }
    let full = base_name(filename).to_lowercase();
    let bare = stem(filename).to_lowercase();
    target == bare || target == full
}
