use serde::{Deserialize, Serialize};

use super::text::{collapse_ws, lower};

/// Structural template of a petition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FormType {
    /// Probate petition (P-1).
    FormA,
    FormB,
    /// Affidavit of heirship.
    FormC,
    /// Voluntary (small estate) administration.
    FormD,
    /// Petition for letters of administration (A-1).
    FormAdmin,
    Unknown,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormA => "FORM_A",
            Self::FormB => "FORM_B",
            Self::FormC => "FORM_C",
            Self::FormD => "FORM_D",
            Self::FormAdmin => "FORM_ADMIN",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for FormType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifier output for one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    pub form_type: FormType,
    /// Score over the type's own maximum, in `[0, 1]`.
    pub confidence: f64,
    pub matched_markers: Vec<String>,
}

impl DetectionResult {
    pub fn unknown() -> Self {
        Self {
            form_type: FormType::Unknown,
            confidence: 0.0,
            matched_markers: Vec::new(),
        }
    }

    /// Confidence rounded to three decimals, as written to the run log.
    pub fn confidence_score(&self) -> f64 {
        (self.confidence * 1000.0).round() / 1000.0
    }
}

type MarkerTable = &'static [(&'static str, u32)];

/// Weighted phrase markers per form type, in evaluation order.
pub const FORM_MARKERS: &[(FormType, MarkerTable)] = &[
    (
        FormType::FormA,
        &[
            ("surrogate's court", 2),
            ("administration petition", 3),
            ("administration proceeding", 2),
            ("file no.", 1),
            ("state of new york", 1),
            ("county of richmond", 3),
            ("staten island", 3),
            ("domicile", 1),
            ("improved real property", 1),
        ],
    ),
    (
        FormType::FormB,
        &[
            ("probate petition", 3),
            ("letters testamentary", 2),
            ("citations", 1),
            ("kings county", 2),
            ("queens county", 2),
            ("surrogate court of", 1),
            ("telephone number", 1),
        ],
    ),
    (
        FormType::FormC,
        &[
            ("affidavit of heirship", 3),
            ("family tree", 2),
            ("renunciation", 2),
            ("waiver of process", 2),
            ("distributee", 2),
            ("relationship to decedent", 1),
        ],
    ),
    (
        FormType::FormD,
        &[
            ("voluntary administration", 3),
            ("small estate", 3),
            ("public administrator", 2),
            ("carolyn rubio diaz", 4),
            ("surrogate's court richmond county", 3),
            ("docket number", 1),
        ],
    ),
    (
        FormType::FormAdmin,
        &[
            ("petition for letters of administration", 4),
            ("petition for letters of", 3),
            ("administration proceeding", 3),
            ("form a-1", 3),
            ("a1 (03/18)", 3),
            ("petitioner information", 2),
            ("decedent information", 2),
            ("surrogate's court of the state of new york", 1),
        ],
    ),
];

fn score_form(text: &str, markers: MarkerTable) -> (u32, Vec<String>) {
    let mut score = 0;
    let mut matched = Vec::new();
    for (marker, weight) in markers {
        if text.contains(marker) {
            score += weight;
            matched.push(marker.to_string());
        }
    }
    (score, matched)
}

/// Score every form type's markers against the segment text.
///
/// A letters-of-administration caption combined with an A-1 form marker
/// short-circuits to ADMIN with full confidence.
pub fn detect(text: &str) -> DetectionResult {
    let text = lower(&collapse_ws(text));
    if text.contains("petition for letters of")
        && ["administration proceeding", "form a-1", "a1 (03/18)"]
            .iter()
            .any(|m| text.contains(m))
    {
        return DetectionResult {
            form_type: FormType::FormAdmin,
            confidence: 1.0,
            matched_markers: vec![
                "petition for letters of".to_string(),
                "administration proceeding".to_string(),
            ],
        };
    }

    let mut best = DetectionResult::unknown();
    for (form_type, markers) in FORM_MARKERS {
        let (score, matched) = score_form(&text, markers);
        let max_score = markers.iter().map(|(_, w)| w).sum::<u32>().max(1);
        let confidence = f64::from(score) / f64::from(max_score);
        if confidence > best.confidence
            || (confidence == best.confidence && matched.len() > best.matched_markers.len())
        {
            best = DetectionResult {
                form_type: *form_type,
                confidence,
                matched_markers: matched,
            };
        }
    }
    if best.confidence <= 0.0 {
        return DetectionResult::unknown();
    }
    best
}

/// Classification after applying an external hint, plus the raw detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub detection: DetectionResult,
    /// The hint disagreed with the marker scores.
    pub conflict: bool,
}

/// Detect the form type; a hint overrides it unconditionally.
pub fn classify(text: &str, hint: Option<FormType>) -> Classification {
    let raw = detect(text);
    match hint {
        Some(hint) => Classification {
            conflict: raw.form_type != hint,
            detection: DetectionResult {
                form_type: hint,
                confidence: 1.0,
                matched_markers: vec!["form_hint".to_string()],
            },
        },
        None => Classification {
            detection: raw,
            conflict: false,
        },
    }
}

/// Cheap caption check over the first two pages of a segment.
pub fn simple_form_hint(pages: &[String]) -> Option<FormType> {
    let scope = lower(&pages.iter().take(2).cloned().collect::<Vec<_>>().join("\n"));
    let has = |phrases: &[&str]| phrases.iter().any(|p| scope.contains(p));
    if has(&["form p-1", "petition for probate", "probate proceeding"]) {
        Some(FormType::FormA)
    } else if has(&[
        "form a-1",
        "petition for letters of administration",
        "administration proceeding",
    ]) {
        Some(FormType::FormAdmin)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_fast_path() {
        let text = "PETITION FOR LETTERS OF ADMINISTRATION\nAdministration Proceeding";
        let det = detect(text);
        assert_eq!(det.form_type, FormType::FormAdmin);
        assert_eq!(det.confidence, 1.0);
        assert_eq!(det.matched_markers.len(), 2);
    }

    #[test]
    fn empty_text_is_unknown() {
        assert_eq!(detect("nothing relevant here"), DetectionResult::unknown());
    }

    #[test]
    fn confidence_is_relative_to_own_maximum() {
        // Form C maximum is 12; affidavit of heirship + family tree = 5.
        let det = detect("Affidavit of Heirship with a family   tree");
        assert_eq!(det.form_type, FormType::FormC);
        assert!((det.confidence - 5.0 / 12.0).abs() < 1e-9);
        assert_eq!(det.confidence_score(), 0.417);
    }

    #[test]
    fn voluntary_administration_is_form_d() {
        let det = detect("Voluntary Administration of a small estate, docket number 12");
        assert_eq!(det.form_type, FormType::FormD);
    }

    #[test]
    fn hint_overrides_and_flags_conflict() {
        let c = classify("Affidavit of heirship", Some(FormType::FormAdmin));
        assert_eq!(c.detection.form_type, FormType::FormAdmin);
        assert_eq!(c.detection.matched_markers, vec!["form_hint".to_string()]);
        assert!(c.conflict);

        let c = classify("Petition for letters of administration, form a-1", Some(FormType::FormAdmin));
        assert!(!c.conflict);
    }

    #[test]
    fn hint_reads_first_two_pages_only() {
        let pages = vec![
            "cover".to_string(),
            "Form P-1 Probate Proceeding".to_string(),
            "Administration Proceeding".to_string(),
        ];
        assert_eq!(simple_form_hint(&pages), Some(FormType::FormA));
        assert_eq!(simple_form_hint(&pages[2..]), Some(FormType::FormAdmin));
        assert_eq!(simple_form_hint(&["cover".to_string()]), None);
    }

    #[test]
    fn form_type_labels() {
        assert_eq!(FormType::FormAdmin.to_string(), "FORM_ADMIN");
        assert_eq!(
            serde_json::to_string(&FormType::FormA).unwrap(),
            "\"FORM_A\""
        );
    }
}
