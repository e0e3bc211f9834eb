//! Country lookups for platforms that target by numeric location id.

/// (ISO 3166-1 alpha-2, ISO 3166-1 numeric, GeoNames id)
const COUNTRIES: &[(&str, u32, u32)] = &[
    ("AE", 784, 290557),
    ("AR", 32, 3865483),
    ("AT", 40, 2782113),
    ("AU", 36, 2077456),
    ("BD", 50, 1210997),
    ("BE", 56, 2802361),
    ("BR", 76, 3469034),
    ("CA", 124, 6251999),
    ("CH", 756, 2658434),
    ("CL", 152, 3895114),
    ("CO", 170, 3686110),
    ("DE", 276, 2921044),
    ("DK", 208, 2623032),
    ("EG", 818, 357994),
    ("ES", 724, 2510769),
    ("FI", 246, 660013),
    ("FR", 250, 3017382),
    ("GB", 826, 2635167),
    ("ID", 360, 1643084),
    ("IE", 372, 2963597),
    ("IN", 356, 1269750),
    ("IT", 380, 3175395),
    ("JP", 392, 1861060),
    ("KR", 410, 1835841),
    ("MX", 484, 3996063),
    ("MY", 458, 1733045),
    ("NG", 566, 2328926),
    ("NL", 528, 2750405),
    ("NO", 578, 3144096),
    ("NZ", 554, 2186224),
    ("PH", 608, 1694008),
    ("PK", 586, 1168579),
    ("PL", 616, 798544),
    ("PT", 620, 2264397),
    ("SA", 682, 102358),
    ("SE", 752, 2661886),
    ("SG", 702, 1880251),
    ("TH", 764, 1605651),
    ("TR", 792, 298795),
    ("US", 840, 6252001),
    ("VN", 704, 1562822),
    ("ZA", 710, 953987),
];

fn lookup(code: &str) -> Option<&'static (&'static str, u32, u32)> {
    let code = code.trim();
    COUNTRIES.iter().find(|(alpha2, _, _)| alpha2.eq_ignore_ascii_case(code))
}

/// GeoNames id used by TikTok `location_ids`.
pub fn geonames_id(code: &str) -> Option<u32> {
    lookup(code).map(|(_, _, geonames)| *geonames)
}

/// Google Ads country geo target constant: 2000 + ISO numeric.
pub fn google_geo_target(code: &str) -> Option<u32> {
    lookup(code).map(|(_, numeric, _)| 2000 + numeric)
}

pub fn normalize_country(code: &str) -> Option<&'static str> {
    lookup(code).map(|(alpha2, _, _)| *alpha2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_countries() {
        assert_eq!(geonames_id("US"), Some(6252001));
        assert_eq!(geonames_id("us"), Some(6252001));
        assert_eq!(google_geo_target("US"), Some(2840));
        assert_eq!(google_geo_target("GB"), Some(2826));
        assert_eq!(normalize_country(" de "), Some("DE"));
    }

    #[test]
    fn test_unknown_country() {
        assert_eq!(geonames_id("XX"), None);
        assert_eq!(google_geo_target(""), None);
    }
}
