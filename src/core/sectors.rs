//! Canonical sector keyword table.
//!
//! Every keyword is stored lowercase and accent-folded so it can be matched
//! directly against the output of [`fold_text`].

/// Keywords used when no school matches the sector keywords
pub const GENERIC_KEYWORDS: &[&str] = &["lycee", "professionnel", "technique", "technologique"];

static SECTOR_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "informatique",
        &[
            "informatique",
            "numerique",
            "developpement",
            "web",
            "reseau",
            "systemes numeriques",
            "cybersecurite",
            "logiciel",
            "digital",
            "ciel",
        ],
    ),
    (
        "commerce",
        &[
            "commerce",
            "vente",
            "relation client",
            "accueil",
            "metiers de la relation",
            "marketing",
            "negociation",
            "boutique",
        ],
    ),
    (
        "industrie",
        &[
            "industrie",
            "industriel",
            "mecanique",
            "usinage",
            "maintenance",
            "productique",
            "chaudronnerie",
            "plasturgie",
            "pilotage de lignes",
            "microtechniques",
        ],
    ),
    (
        "batiment",
        &[
            "batiment",
            "btp",
            "construction",
            "travaux publics",
            "maconnerie",
            "menuiserie",
            "plomberie",
            "genie civil",
            "charpente",
            "peinture",
        ],
    ),
    (
        "restauration",
        &[
            "restauration",
            "cuisine",
            "hotellerie",
            "hotel",
            "boulangerie",
            "patisserie",
            "commercialisation et services en restauration",
            "boucherie",
            "traiteur",
        ],
    ),
    (
        "transport",
        &[
            "transport",
            "conduite",
            "routier",
            "automobile",
            "maintenance des vehicules",
            "carrosserie",
            "aeronautique",
            "ferroviaire",
        ],
    ),
    (
        "logistique",
        &["logistique", "entrepot", "magasinage", "supply chain", "manutention"],
    ),
    (
        "sante",
        &[
            "sante",
            "soins",
            "medical",
            "aide-soignant",
            "infirmier",
            "pharmacie",
            "accompagnement, soins et services a la personne",
            "assp",
            "sanitaire",
            "optique",
        ],
    ),
    (
        "agriculture",
        &[
            "agriculture",
            "agricole",
            "horticulture",
            "paysage",
            "viticulture",
            "elevage",
            "agroequipement",
            "forestier",
        ],
    ),
    (
        "beaute",
        &["beaute", "esthetique", "coiffure", "cosmetique", "soins esthetiques"],
    ),
    (
        "energie",
        &[
            "energie",
            "electricite",
            "electrotechnique",
            "melec",
            "climatique",
            "froid",
            "photovoltaique",
            "installateur",
        ],
    ),
    (
        "administration",
        &[
            "administration",
            "gestion",
            "assistance a la gestion",
            "secretariat",
            "comptabilite",
            "agora",
            "tertiaire",
        ],
    ),
];

static SECTOR_ALIASES: &[(&str, &str)] = &[
    ("it", "informatique"),
    ("numerique", "informatique"),
    ("digital", "informatique"),
    ("vente", "commerce"),
    ("btp", "batiment"),
    ("construction", "batiment"),
    ("hotellerie", "restauration"),
    ("hotellerie-restauration", "restauration"),
    ("mecanique", "industrie"),
    ("medical", "sante"),
    ("social", "sante"),
    ("esthetique", "beaute"),
    ("coiffure", "beaute"),
    ("electricite", "energie"),
    ("tertiaire", "administration"),
];

/// Lowercase and strip French diacritics
pub fn fold_text(text: &str) -> String {
    let mut folded = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        match c {
            'à' | 'â' | 'ä' | 'á' | 'ã' => folded.push('a'),
            'é' | 'è' | 'ê' | 'ë' => folded.push('e'),
            'î' | 'ï' | 'í' => folded.push('i'),
            'ô' | 'ö' | 'ó' | 'õ' => folded.push('o'),
            'ù' | 'û' | 'ü' | 'ú' => folded.push('u'),
            'ÿ' => folded.push('y'),
            'ç' => folded.push('c'),
            'ñ' => folded.push('n'),
            'œ' => folded.push_str("oe"),
            'æ' => folded.push_str("ae"),
            '’' => folded.push('\''),
            other => folded.push(other),
        }
    }
    folded
}

/// Normalize a user-supplied sector into its canonical identifier.
///
/// Known aliases resolve to their canonical sector; anything else is
/// returned folded and trimmed.
pub fn normalize_sector(sector: &str) -> String {
    let folded = fold_text(sector.trim());
    SECTOR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == folded)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(folded)
}

/// Keywords for a sector.
///
/// An unknown sector yields a single keyword: the sector itself.
pub fn keywords_for(sector: &str) -> Vec<String> {
    let sector = normalize_sector(sector);
    match SECTOR_KEYWORDS.iter().find(|(id, _)| *id == sector) {
        Some((_, keywords)) => keywords.iter().map(|k| k.to_string()).collect(),
        None => vec![sector],
    }
}

pub fn is_known_sector(sector: &str) -> bool {
    let sector = normalize_sector(sector);
    SECTOR_KEYWORDS.iter().any(|(id, _)| *id == sector)
}

/// The whole table, in declaration order
pub fn sector_table() -> impl Iterator<Item = (&'static str, &'static [&'static str])> {
    SECTOR_KEYWORDS.iter().copied()
}

/// Map a NAF/APE activity code (e.g. "62.01Z") to a sector identifier
pub fn sector_for_naf(code: &str) -> Option<&'static str> {
    let digits: String = code.chars().filter(|c| c.is_ascii_digit()).take(4).collect();
    let division: u32 = digits.get(..2)?.parse().ok()?;

    let sector = match division {
        1..=3 => "agriculture",
        5..=33 | 36..=39 => "industrie",
        35 => "energie",
        41..=43 => "batiment",
        45 => "transport",
        46 | 47 => "commerce",
        49..=51 => "transport",
        52 | 53 => "logistique",
        55 | 56 => "restauration",
        58 if digits.starts_with("582") => "informatique",
        61..=63 => "informatique",
        69 | 70 | 78 | 82 | 84 => "administration",
        75 | 86..=88 => "sante",
        96 if digits.starts_with("9602") => "beaute",
        _ => return None,
    };

    Some(sector)
}
