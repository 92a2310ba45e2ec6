// Canonical section ids and the alias table that maps loose names onto them.

pub mod slug;

pub use slug::normalize_key;

/// The closed set of section ids a page may contain.
pub const CANONICAL_SECTIONS: &[&str] = &[
    "hero",
    "features",
    "testimonials",
    "pricing_tiered",
    "faq_accordion",
    "cta",
    "gallery",
    "team",
    "stats",
    "logo_cloud",
    "footer",
];

// Keys are in `normalize_key` form.
const ALIASES: &[(&str, &str)] = &[
    ("hero_banner", "hero"),
    ("banner", "hero"),
    ("intro", "hero"),
    ("header", "hero"),
    ("feature", "features"),
    ("feature_detail", "features"),
    ("feature_details", "features"),
    ("feature_grid", "features"),
    ("benefits", "features"),
    ("testimonial", "testimonials"),
    ("reviews", "testimonials"),
    ("quotes", "testimonials"),
    ("pricing", "pricing_tiered"),
    ("pricing_table", "pricing_tiered"),
    ("plans", "pricing_tiered"),
    ("tiers", "pricing_tiered"),
    ("faq", "faq_accordion"),
    ("faqs", "faq_accordion"),
    ("questions", "faq_accordion"),
    ("contact", "cta"),
    ("contact_us", "cta"),
    ("call_to_action", "cta"),
    ("signup", "cta"),
    ("sign_up", "cta"),
    ("get_started", "cta"),
    ("images", "gallery"),
    ("portfolio", "gallery"),
    ("showcase", "gallery"),
    ("about_team", "team"),
    ("our_team", "team"),
    ("people", "team"),
    ("metrics", "stats"),
    ("numbers", "stats"),
    ("statistics", "stats"),
    ("logos", "logo_cloud"),
    ("clients", "logo_cloud"),
    ("partners", "logo_cloud"),
    ("customers", "logo_cloud"),
    ("site_footer", "footer"),
];

/// Whether `id` is exactly one of the canonical section ids.
pub fn is_canonical(id: &str) -> bool {
    CANONICAL_SECTIONS.contains(&id)
}

/// Map a section identifier onto its canonical id.
///
/// Canonical ids map to themselves; aliases are looked up after
/// normalization. Returns `None` for anything else.
pub fn canonicalize(raw: &str) -> Option<&'static str> {
    let key = normalize_key(raw);
    if key.is_empty() {
        return None;
    }
    CANONICAL_SECTIONS
        .iter()
        .copied()
        .find(|id| *id == key)
        .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == key).map(|(_, id)| *id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_ids_map_to_themselves() {
        for id in CANONICAL_SECTIONS {
            assert_eq!(canonicalize(id), Some(*id));
            assert!(is_canonical(id));
        }
    }

    #[test]
    fn aliases_resolve_after_normalization() {
        assert_eq!(canonicalize("pricing"), Some("pricing_tiered"));
        assert_eq!(canonicalize("FAQ"), Some("faq_accordion"));
        assert_eq!(canonicalize("Contact Us"), Some("cta"));
        assert_eq!(canonicalize("feature-detail"), Some("features"));
        assert_eq!(canonicalize("Logo Cloud"), Some("logo_cloud"));
    }

    #[test]
    fn unknown_ids_do_not_resolve() {
        assert_eq!(canonicalize("blog"), None);
        assert_eq!(canonicalize(""), None);
        assert_eq!(canonicalize("---"), None);
    }

    #[test]
    fn every_alias_targets_a_canonical_id() {
        for (alias, target) in ALIASES {
            assert!(is_canonical(target), "{alias} -> {target}");
            assert_eq!(normalize_key(alias), *alias);
        }
    }

    #[test]
    fn is_canonical_is_exact() {
        assert!(!is_canonical("Hero"));
        assert!(!is_canonical("pricing"));
    }
}
