//! Static security screening of submitted code.
//!
//! A best-effort deterrent, not a security boundary: the real enforcement
//! is the network-disabled, resource-capped sandbox. The screener rejects
//! code that matches a per-language denylist of regular expressions before
//! any sandbox is leased, so obviously hostile submissions never consume a
//! pool slot.
//!
//! Rules are compiled once at startup and the screener is shared by
//! reference; there is no mutable or global state.

use crate::errors::JudgeError;
use regex::Regex;
use std::collections::HashMap;

/// A matched denylist rule. Carries the pattern that fired, which becomes
/// the violation reason on the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub pattern: String,
}

/// Per-language denylists of precompiled patterns.
///
/// Unknown languages and blank code pass unscreened (fail-open); the
/// sandbox still contains whatever the screener misses.
pub struct SecurityScreener {
    rules: HashMap<String, Vec<Regex>>,
}

impl SecurityScreener {
    /// Build the screener with the built-in denylists.
    pub fn new() -> Result<Self, JudgeError> {
        let mut rules = HashMap::new();

        // Java: file I/O, process execution, sockets, reflection
        let java = vec![
            r"\bFiles\b",
            r"\bFile\b",
            r"\bFileInputStream\b",
            r"\bFileOutputStream\b",
            r"\bRuntime\b",
            r"\bexec\b",
            r"\bProcessBuilder\b",
            r"\bProcess\b",
            r"\bnet\b",
            r"\bSocket\b",
            r"\bServerSocket\b",
            r"\breflect\b",
            r"\bMethod\b",
            r"\bClass\.forName\b",
        ];
        rules.insert("java".to_string(), Self::compile(&java)?);

        // C/C++: raw system calls
        let cpp = vec![r"\bsystem\b", r"\bfork\b", r"\bopen\b", r"\bexec\b", r"\bsocket\b"];
        rules.insert("cpp".to_string(), Self::compile(&cpp)?);
        rules.insert("c++".to_string(), Self::compile(&cpp)?);

        // Python: shell-outs, dynamic eval, file and network access
        let python = vec![
            r"\bos\.system\b",
            r"\bos\.popen\b",
            r"\bsubprocess\b",
            r"\bexec\b",
            r"\beval\b",
            r"\bopen\b",
            r"\bsocket\b",
            r"\burllib\b",
            r"\bhttp\.client\b",
            r"\brequests\b",
        ];
        rules.insert("python".to_string(), Self::compile(&python)?);
        rules.insert("python3".to_string(), Self::compile(&python)?);

        Ok(Self { rules })
    }

    fn compile(patterns: &[&str]) -> Result<Vec<Regex>, JudgeError> {
        patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    JudgeError::ConfigError(format!("Invalid security rule '{}': {}", p, e))
                })
            })
            .collect()
    }

    /// Screen `code` against the denylist for `language`.
    ///
    /// Returns the first matching rule, or `None` when the code is clean,
    /// blank, or the language has no configured rules.
    pub fn screen(&self, code: &str, language: &str) -> Option<Violation> {
        if code.trim().is_empty() {
            return None;
        }
        let lang_key = language.trim().to_lowercase();
        let patterns = self.rules.get(&lang_key)?;
        for pattern in patterns {
            if pattern.is_match(code) {
                return Some(Violation {
                    pattern: pattern.as_str().to_string(),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screener() -> SecurityScreener {
        SecurityScreener::new().unwrap()
    }

    #[test]
    fn test_python_shell_out_is_rejected() {
        let violation = screener().screen("import os\nos.system('rm -rf /')", "python");
        assert!(violation.is_some());
    }

    #[test]
    fn test_python_print_is_accepted() {
        assert!(screener().screen("print(1)", "python").is_none());
    }

    #[test]
    fn test_cpp_system_call_is_rejected() {
        let code = "#include <cstdlib>\nint main() { system(\"ls\"); }";
        let violation = screener().screen(code, "cpp").unwrap();
        assert_eq!(violation.pattern, r"\bsystem\b");
    }

    #[test]
    fn test_java_process_builder_is_rejected() {
        let code = "new ProcessBuilder(\"sh\").start();";
        assert!(screener().screen(code, "java").is_some());
    }

    #[test]
    fn test_unknown_language_fails_open() {
        assert!(screener().screen("os.system('x')", "brainfuck").is_none());
    }

    #[test]
    fn test_blank_code_fails_open() {
        assert!(screener().screen("   \n", "python").is_none());
    }

    #[test]
    fn test_language_is_normalized() {
        assert!(screener().screen("eval(input())", " Python3 ").is_some());
    }

    #[test]
    fn test_first_matching_rule_is_reported() {
        // "open" appears after "os.system" in the python table; the earlier
        // rule wins.
        let violation = screener()
            .screen("os.system(open('f').read())", "python")
            .unwrap();
        assert_eq!(violation.pattern, r"\bos\.system\b");
    }
}
