//! Frame classification for separating runtime/OS code from user modules.
//!
//! The stack sampler needs two independent answers for every frame:
//!
//! 1. **Is this module the runtime/OS?** - e.g. `libc.so.6`, the dynamic
//!    loader, the vDSO. Frames in such modules are not reported as
//!    contributing modules, and the first one marks the boundary where the
//!    thread entered platform code.
//! 2. **Is this resolved name an OS entry function?** - blocking entry points
//!    such as `epoll_wait` or `pthread_cond_wait`. The outermost one found
//!    becomes the thread's displayed location.
//!
//! Both are capability objects ([`ModuleClassifier`], [`FunctionClassifier`])
//! injected into the monitor, so tests can supply exact classification tables.
//! The default implementations are table-driven and can be extended from
//! configuration.

use std::collections::HashSet;

/// Decides whether a module belongs to the runtime/OS.
pub trait ModuleClassifier {
    fn is_os_module(&self, module: &str) -> bool;
}

/// Decides whether a resolved function name is an OS entry function.
pub trait FunctionClassifier {
    fn is_os_function(&self, name: &str) -> bool;
}

// =============================================================================
// CLASSIFICATION TABLES
// =============================================================================

/// Runtime/OS module name prefixes (matched against the lowercase basename).
/// Library entries end at `.so` or at glibc's versioned `-2.` suffix, so
/// `librt` does not swallow `librte_*` or `librtmp`.
const OS_MODULE_PREFIXES: &[&str] = &[
    "libc.so",
    "libc-2.",
    "ld-linux",
    "ld-musl",
    "ld64.so",
    "libpthread.so",
    "libpthread-2.",
    "libdl.so",
    "libdl-2.",
    "librt.so",
    "librt-2.",
    "libm.so",
    "libm-2.",
    "libgcc_s.so",
    "libstdc++.so",
    "linux-vdso",
    "linux-gate",
    "[vdso]",
    "[vsyscall]",
];

/// Blocking entry points exported by libc and the loader
const OS_FUNCTION_NAMES: &[&str] = &[
    "syscall",
    "epoll_wait",
    "epoll_pwait",
    "epoll_pwait2",
    "poll",
    "ppoll",
    "select",
    "pselect",
    "nanosleep",
    "clock_nanosleep",
    "sleep",
    "usleep",
    "pthread_cond_wait",
    "pthread_cond_timedwait",
    "pthread_cond_clockwait",
    "pthread_mutex_lock",
    "pthread_rwlock_rdlock",
    "pthread_rwlock_wrlock",
    "pthread_join",
    "sem_wait",
    "sem_timedwait",
    "sem_clockwait",
    "read",
    "write",
    "readv",
    "writev",
    "pread64",
    "pwrite64",
    "recv",
    "recvfrom",
    "recvmsg",
    "send",
    "sendto",
    "sendmsg",
    "accept",
    "accept4",
    "connect",
    "waitpid",
    "wait4",
    "pause",
    "sigwait",
    "sigtimedwait",
    "io_uring_enter",
];

/// Internal libc aliases of the entry points above
const OS_FUNCTION_PREFIXES: &[&str] = &[
    "__GI___",
    "__libc_recv",
    "__libc_send",
    "__libc_read",
    "__libc_write",
    "__libc_accept",
    "__libc_connect",
    "__futex_abstimed_wait",
    "__pthread_cond_",
    "__pthread_mutex_lock",
    "__lll_lock_wait",
    "futex_wait",
];

// =============================================================================
// TABLE-DRIVEN CLASSIFIERS
// =============================================================================

/// Exact names plus prefixes.
#[derive(Debug, Clone, Default)]
struct NameTable {
    names: HashSet<String>,
    prefixes: Vec<String>,
}

impl NameTable {
    fn matches(&self, candidate: &str) -> bool {
        self.names.contains(candidate) || self.prefixes.iter().any(|p| candidate.starts_with(p))
    }

    /// Entries ending in `*` are prefixes, everything else is an exact name.
    fn add(&mut self, entry: &str) {
        if let Some(prefix) = entry.strip_suffix('*') {
            if !prefix.is_empty() {
                self.prefixes.push(prefix.to_owned());
            }
        } else if !entry.is_empty() {
            self.names.insert(entry.to_owned());
        }
    }
}

/// Default [`ModuleClassifier`]: glibc/musl runtime, loader and vDSO.
#[derive(Debug, Clone)]
pub struct OsModules {
    table: NameTable,
}

impl OsModules {
    /// Classifier with the built-in Linux module table.
    #[must_use]
    pub fn linux_defaults() -> Self {
        let mut table = NameTable::default();
        table.prefixes.extend(OS_MODULE_PREFIXES.iter().map(|p| (*p).to_owned()));
        Self { table }
    }

    /// Classifier that knows only the given entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut modules = Self { table: NameTable::default() };
        modules.extend(entries);
        modules
    }

    /// Add entries; a trailing `*` makes an entry a prefix.
    pub fn extend<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            self.table.add(&entry.as_ref().to_lowercase());
        }
    }
}

impl ModuleClassifier for OsModules {
    fn is_os_module(&self, module: &str) -> bool {
        self.table.matches(&module_basename(module).to_lowercase())
    }
}

/// Default [`FunctionClassifier`]: blocking libc entry points.
#[derive(Debug, Clone)]
pub struct OsFunctions {
    table: NameTable,
}

impl OsFunctions {
    /// Classifier with the built-in libc function table.
    #[must_use]
    pub fn linux_defaults() -> Self {
        let mut table = NameTable::default();
        table.names.extend(OS_FUNCTION_NAMES.iter().map(|n| (*n).to_owned()));
        table.prefixes.extend(OS_FUNCTION_PREFIXES.iter().map(|p| (*p).to_owned()));
        Self { table }
    }

    /// Classifier that knows only the given entries.
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut functions = Self { table: NameTable::default() };
        functions.extend(entries);
        functions
    }

    /// Add entries; a trailing `*` makes an entry a prefix.
    pub fn extend<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            self.table.add(entry.as_ref());
        }
    }
}

impl FunctionClassifier for OsFunctions {
    fn is_os_function(&self, name: &str) -> bool {
        // Symbolizers may append an offset ("read+0x1e"); classify the bare name
        let bare = name.split_once('+').map_or(name, |(head, _)| head);
        self.table.matches(bare.trim())
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Last path component of a module path.
fn module_basename(module: &str) -> &str {
    module.rsplit('/').next().unwrap_or(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_libc_is_os_module() {
        let modules = OsModules::linux_defaults();
        assert!(modules.is_os_module("libc.so.6"));
        assert!(modules.is_os_module("/usr/lib/x86_64-linux-gnu/libc.so.6"));
        assert!(modules.is_os_module("ld-linux-x86-64.so.2"));
        assert!(modules.is_os_module("[vdso]"));
    }

    #[test]
    fn test_user_module_is_not_os() {
        let modules = OsModules::linux_defaults();
        assert!(!modules.is_os_module("my-server"));
        assert!(!modules.is_os_module("/opt/app/libengine.so"));
    }

    #[test]
    fn test_runtime_prefixes_stop_at_delimiter() {
        let modules = OsModules::linux_defaults();
        assert!(modules.is_os_module("librt.so.1"));
        assert!(modules.is_os_module("libpthread.so.0"));
        assert!(modules.is_os_module("/lib/x86_64-linux-gnu/libc-2.31.so"));
        assert!(modules.is_os_module("libdl-2.31.so"));

        assert!(!modules.is_os_module("librte_eal.so.23"));
        assert!(!modules.is_os_module("librtmp.so.1"));
        assert!(!modules.is_os_module("libdlt.so.2"));
        assert!(!modules.is_os_module("libc-client.so.2007"));
        assert!(!modules.is_os_module("libmagic.so.1"));
    }

    #[test]
    fn test_module_case_insensitive() {
        let modules = OsModules::from_entries(["LIBJEMALLOC.SO.2"]);
        assert!(modules.is_os_module("libjemalloc.so.2"));
        assert!(modules.is_os_module("/usr/lib/x86_64-linux-gnu/LibJemalloc.so.2"));
    }

    #[test]
    fn test_blocking_functions() {
        let functions = OsFunctions::linux_defaults();
        assert!(functions.is_os_function("epoll_wait"));
        assert!(functions.is_os_function("__GI___poll"));
        assert!(functions.is_os_function("read+0x1e"));
        assert!(!functions.is_os_function("start_thread"));
        assert!(!functions.is_os_function("myapp::handler::process"));
    }

    #[test]
    fn test_custom_prefix_entries() {
        let mut functions = OsFunctions::from_entries(["spin_wait*"]);
        assert!(functions.is_os_function("spin_wait_until"));
        assert!(!functions.is_os_function("park"));

        functions.extend(["park"]);
        assert!(functions.is_os_function("park"));
        assert!(!functions.is_os_function("park_timeout"));
    }

    #[test]
    fn test_empty_entries_ignored() {
        let functions = OsFunctions::from_entries(["", "*"]);
        assert!(!functions.is_os_function(""));
        assert!(!functions.is_os_function("anything"));
    }
}
