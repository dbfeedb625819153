//! Process-wide compiled text patterns.
//!
//! Compiled once, on the first call to [`ensure_initialized`] or the first
//! detector pass, and shared read-only by every thread afterwards.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use regex::Regex;

static INITIALIZED: AtomicBool = AtomicBool::new(false);
static PATTERNS: OnceLock<Patterns> = OnceLock::new();

/// Patterns used by the heading, table and list detectors.
pub(crate) struct Patterns {
    /// `1 `, `1. `, `1.2.3 `
    pub numbering: Regex,
    pub heading_keyword: Regex,
    pub bullet: Regex,
    pub numbered: Regex,
    pub alpha: Regex,
    pub roman: Regex,
    /// Runs of two or more spaces
    pub cell_separator: Regex,
}

impl Patterns {
    fn compile() -> Self {
        Self {
            numbering: Regex::new(r"^(\d+(?:\.\d+)*)\.?\s").expect("numbering pattern"),
            heading_keyword: Regex::new(
                r"(?i)\b(chapter|section|part|appendix|introduction|conclusions?|summary|abstract|overview|background|references|bibliography|contents|preface|acknowledge?ments?|discussion|results|methods|methodology)\b",
            )
            .expect("keyword pattern"),
            bullet: Regex::new(r"^([•\-\*\+])\s+(.*)$").expect("bullet pattern"),
            numbered: Regex::new(r"^(\d+[.)])\s+(.*)$").expect("numbered pattern"),
            alpha: Regex::new(r"^([a-zA-Z][.)])\s+(.*)$").expect("alpha pattern"),
            roman: Regex::new(r"(?i)^([ivxlcdm]+[.)])\s+(.*)$").expect("roman pattern"),
            cell_separator: Regex::new(r"\s{2,}").expect("separator pattern"),
        }
    }
}

/// Compile the shared pattern set. Idempotent; later calls are a flag check.
pub fn ensure_initialized() {
    if INITIALIZED.load(Ordering::Acquire) {
        return;
    }
    PATTERNS.get_or_init(Patterns::compile);
    if !INITIALIZED.swap(true, Ordering::AcqRel) {
        log::debug!("Compiled classifier patterns");
    }
}

/// Whether [`ensure_initialized`] has run.
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

pub(crate) fn patterns() -> &'static Patterns {
    ensure_initialized();
    PATTERNS.get_or_init(Patterns::compile)
}
