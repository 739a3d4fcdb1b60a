//! Row-level classification of free-text clinical fields.

use serde::Serialize;
use std::fmt;

/// Site keywords that make a fracture a major osteoporotic one.
const MOP_KEYWORDS: [&str; 15] = [
    "HIP",
    "SPINE",
    "SPINAL",
    "L1",
    "L2",
    "L3",
    "D12",
    "COLLAPSE",
    "BIOCONCAVE",
    "WRIST",
    "FOREARM",
    "RADIUS",
    "LUNATE",
    "HUMERUS",
    "SHOULDER",
];

/// Fracture site category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FractureSite {
    /// Major osteoporotic: spine, hip, wrist/forearm, proximal humerus
    Mop,
    Other,
}

impl fmt::Display for FractureSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FractureSite::Mop => write!(f, "MOP"),
            FractureSite::Other => write!(f, "Other"),
        }
    }
}

impl FractureSite {
    /// Classify a free-text site description. `None` when no fracture is recorded.
    pub fn classify(site: &str) -> Option<Self> {
        let site = site.trim().to_uppercase();
        if site.is_empty() || site == "NO FRACTURE" || site == "NAN" {
            return None;
        }
        if MOP_KEYWORDS.iter().any(|k| site.contains(k)) {
            Some(FractureSite::Mop)
        } else {
            Some(FractureSite::Other)
        }
    }
}

/// Interpret a messy yes/done/present flag.
pub fn is_positive(value: &str) -> bool {
    let s = value.trim().to_uppercase();
    if s.contains("NOT") {
        return false;
    }
    s.contains("DONE") || s.contains("YES") || s == "Y" || s.contains("PRESENT")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fracture_site() {
        assert_eq!(FractureSite::classify("Left hip"), Some(FractureSite::Mop));
        assert_eq!(FractureSite::classify("D12 collapse"), Some(FractureSite::Mop));
        assert_eq!(FractureSite::classify("distal radius"), Some(FractureSite::Mop));
        assert_eq!(FractureSite::classify("ankle"), Some(FractureSite::Other));
        assert_eq!(FractureSite::classify(" No Fracture "), None);
        assert_eq!(FractureSite::classify(""), None);
    }

    #[test]
    fn test_is_positive() {
        assert!(is_positive("hrpqct done"));
        assert!(is_positive("YES"));
        assert!(is_positive(" y "));
        assert!(is_positive("Present"));
        assert!(!is_positive("NOT DONE"));
        assert!(!is_positive("absent"));
        assert!(!is_positive("N"));
        assert!(!is_positive(""));
    }
}
