// Relationship type decision for a pair that passed the evidence gate

use super::evidence::{EvidenceItem, EvidenceType};
use super::{MediaReference, RelationshipType};
use crate::constants::{MASTER_EXTENSIONS, MASTER_INDICATORS, PROXY_EXTENSIONS, PROXY_INDICATORS};

/// What `a` is relative to `b`. Lexical indicators decide first, then the
/// size evidence, then the extension classes; `alternate` otherwise.
pub fn classify(a: &MediaReference, b: &MediaReference, evidence: &[EvidenceItem]) -> RelationshipType {
    let a_proxy = has_indicator(a, &PROXY_INDICATORS);
    let a_master = has_indicator(a, &MASTER_INDICATORS);
    let b_proxy = has_indicator(b, &PROXY_INDICATORS);
    let b_master = has_indicator(b, &MASTER_INDICATORS);

    if a_proxy && !b_proxy {
        return RelationshipType::Proxy;
    }
    if a_master && !b_master {
        return RelationshipType::Master;
    }
    if !a_proxy && b_proxy {
        return RelationshipType::Online;
    }
    if !a_master && b_master {
        return RelationshipType::Offline;
    }

    if let Some(size) = evidence.iter().find(|e| e.kind == EvidenceType::SizeRatio) {
        let ratio1 = size.detail("ratio1").unwrap_or(0.0);
        let ratio2 = size.detail("ratio2").unwrap_or(0.0);
        let tokens = &a.fingerprint.name_tokens;
        let has_any = |words: &[&str]| words.iter().any(|w| tokens.contains(*w));

        if ratio1 < ratio2 {
            if has_any(&["proxy", "prx", "low", "preview"][..]) {
                return RelationshipType::Proxy;
            }
            if has_any(&["offline", "edit", "cut"][..]) {
                return RelationshipType::Offline;
            }
            return RelationshipType::Proxy;
        }
        if ratio1 > ratio2 {
            if has_any(&["master", "original", "source"][..]) {
                return RelationshipType::Master;
            }
            // online/full/hires tokens and plain larger files alike
            return RelationshipType::Online;
        }
    }

    let ext1 = a.asset.primary_file.extension().unwrap_or_default();
    let ext2 = b.asset.primary_file.extension().unwrap_or_default();
    if PROXY_EXTENSIONS.contains(&ext1.as_str()) && MASTER_EXTENSIONS.contains(&ext2.as_str()) {
        return RelationshipType::Proxy;
    }
    if MASTER_EXTENSIONS.contains(&ext1.as_str()) && PROXY_EXTENSIONS.contains(&ext2.as_str()) {
        return RelationshipType::Master;
    }

    RelationshipType::Alternate
}

/// Indicator word in the asset name, or a `/word/` or `/words/` folder in its path.
fn has_indicator(reference: &MediaReference, indicators: &[&str]) -> bool {
    let name = reference.asset.name.to_lowercase();
    let path = reference.asset.primary_file.path.to_lowercase();
    indicators.iter().any(|indicator| {
        name.contains(indicator)
            || path.contains(&format!("/{}/", indicator))
            || path.contains(&format!("/{}s/", indicator))
    })
}
