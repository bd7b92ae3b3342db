//! Word lists shared by the extractors and the normalizer.
//!
//! All entries are lowercase. Callers lowercase their input before lookup.

/// Tokens never kept inside a person name.
pub const STOPWORDS: &[&str] = &[
    "information", "signature", "petitioner", "estate", "administration", "administrator",
    "executor", "decedent", "deceased", "respectfully", "prays", "appointed", "individual",
    "foregoing", "petition", "county", "domicile", "place", "death", "residence", "file",
    "follows", "no", "the", "and", "my", "is", "to", "be", "are", "as", "of", "an", "that",
    "this", "in", "for", "print", "name", "named", "being", "duly", "sworn", "says", "say",
    "verily", "believes", "believe", "informed", "pray", "suc", "shall", "hereby", "herein",
];

/// Full state names and their postal codes, for the states these petitions
/// come from.
pub const STATE_MAP: &[(&str, &str)] = &[
    ("new york", "NY"),
    ("new jersey", "NJ"),
    ("florida", "FL"),
    ("california", "CA"),
    ("connecticut", "CT"),
    ("pennsylvania", "PA"),
    ("texas", "TX"),
    ("georgia", "GA"),
    ("illinois", "IL"),
];

pub const STATE_CODES: &[&str] = &["NY", "NJ", "FL", "CA", "CT", "PA", "TX", "GA", "IL"];

/// Regex alternation matching a state code or full state name.
pub const STATE_ALT: &str = "NY|NJ|FL|CA|CT|PA|TX|GA|IL|New York|New Jersey|Florida|California|Connecticut|Pennsylvania|Texas|Georgia|Illinois";

/// Regex alternation of the two-letter codes only.
pub const STATE_CODE_ALT: &str = "NY|NJ|FL|CA|CT|PA|TX|GA|IL";

/// Role and legal phrasing that must never survive inside an address.
/// An address is cut at the earliest of these.
pub const BANNED_ADDRESS_TERMS: &[&str] = &[
    "beneficiary", "residuary", "legatee", "executor", "executrix", "administrator",
    "administratrix", "trustee", "successor", "co-executor", "nominated", "distributee",
    "fiduciary", "legacy", "devise", "spouse", "husband", "wife", "son", "daughter", "child",
    "petitioner", "guardian", "attorney", "estate of", "other interest", "nature of",
    "designated in will", "under paragraph", "estate", "of last will", "paragraph", "schedule",
];

/// Fiduciary roles that disqualify a line as a relationship answer.
pub const ROLE_BLACKLIST: &[&str] = &[
    "executor", "executrix", "administrator", "trustee", "co-executor", "successor",
    "nominated", "personal representative", "fiduciary", "beneficiary", "legatee",
];

/// Kinship words accepted as a relationship answer.
pub const REL_TOKENS: &[&str] = &[
    "spouse", "wife", "husband", "son", "daughter", "child", "mother", "father", "sister",
    "brother", "niece", "nephew", "grandchild", "grandson", "granddaughter",
];

/// Form labels that leak into name fields.
pub const BANNED_LABEL_PHRASES: &[&str] = &[
    "other", "other specify", "specify", "checkbox", "check one", "attesting witnesses",
    "executor", "administrator", "petitioner", "title officer", "clerk", "proponent",
    "objectant",
];

/// Titles and roles that are never a person's name.
pub const ROLE_WORDS: &[&str] = &[
    "executor", "executrix", "administrator", "administratrix", "petitioner", "title officer",
    "clerk", "trustee", "attorney", "lawyer", "esquire", "paralegal", "notary", "applicant",
];

/// Tokens dropped from a cleaned person name.
pub const NAME_ROLE_TOKENS: &[&str] = &[
    "executor", "executrix", "administrator", "administratrix", "trustee", "fiduciary",
    "legatee", "residuary", "beneficiary", "nominated", "successor",
];

/// Street-type words; an address must contain at least one.
pub const STREET_TOKENS: &[&str] = &[
    "street", "st", "avenue", "ave", "road", "rd", "drive", "dr", "lane", "ln", "boulevard",
    "blvd", "court", "ct", "parkway", "pkwy", "place", "pl", "circle", "cir", "way", "highway",
    "hwy", "apt", "apartment", "unit", "suite", "ste",
];

/// Regex alternation of street-type words, longest forms first.
pub const STREET_ALT: &str = "Street|St|Avenue|Ave|Road|Rd|Drive|Dr|Lane|Ln|Boulevard|Blvd|Court|Ct|Place|Pl|Parkway|Pkwy|Circle|Cir|Way|Highway|Hwy|Terrace|Ter|Loop";

/// Area codes that are valid for New York.
pub const NY_AREA_CODES: &[&str] = &[
    "212", "315", "332", "347", "516", "518", "585", "607", "631", "646", "716", "718", "845",
    "914", "917", "929",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token.to_ascii_lowercase().as_str())
}

/// Postal code for a full state name or code, if known.
pub fn state_code(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_ascii_lowercase();
    STATE_MAP
        .iter()
        .find(|(full, code)| *full == lower || code.eq_ignore_ascii_case(&lower))
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_code_accepts_names_and_codes() {
        assert_eq!(state_code("New Jersey"), Some("NJ"));
        assert_eq!(state_code(" ny "), Some("NY"));
        assert_eq!(state_code("Ohio"), None);
    }

    #[test]
    fn stopwords_are_case_insensitive() {
        assert!(is_stopword("Petitioner"));
        assert!(!is_stopword("Walter"));
    }

    #[test]
    fn ny_area_codes_include_staten_island() {
        assert!(NY_AREA_CODES.contains(&"718"));
        assert!(!NY_AREA_CODES.contains(&"816"));
    }
}
