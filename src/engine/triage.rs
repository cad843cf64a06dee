use crate::models::alert::Category;

struct TriageRule {
    category: Category,
    keywords: &'static [&'static str],
    first_aid: Option<&'static str>,
}

/// Ordered rule table: the first rule with any matching keyword wins, so
/// MEDICAL deliberately outranks TRAPPED for a message mentioning both.
/// Static on purpose: life-safety guidance has to be deterministic and
/// auditable, not learned.
const TRIAGE_RULES: &[TriageRule] = &[
    TriageRule {
        category: Category::Medical,
        keywords: &[
            "injur", "bleed", "blood", "broken", "unconscious", "heart", "breath", "medic",
            "hospital", "hurt", "pain", "wound", "doctor", "sick", "seiz", "faint", "fractur",
            "burn skin",
        ],
        first_aid: Some(
            "Apply direct pressure to wounds with clean cloth. Keep victim still. Do not remove embedded objects. Elevate injured limb if possible. Get trained medic immediately.",
        ),
    },
    TriageRule {
        category: Category::Fire,
        keywords: &[
            "fire", "burn", "smoke", "flame", "blaze", "gas leak", "explosion", "inferno",
        ],
        first_aid: Some(
            "Crawl low under smoke — clean air near floor. Close doors to slow spread. Move upwind. Do NOT use lifts. If on fire: STOP, DROP, ROLL.",
        ),
    },
    TriageRule {
        category: Category::Trapped,
        keywords: &[
            "trap", "stuck", "debris", "rubble", "buried", "collapse", "cant move",
            "cant get out", "locked", "crush", "pinned",
        ],
        first_aid: Some(
            "Stay calm — movement may shift debris. Tap on pipes/metal rhythmically to signal rescuers. Conserve phone battery. Cover mouth/nose from dust.",
        ),
    },
    TriageRule {
        category: Category::Flood,
        keywords: &[
            "flood", "water", "drown", "submerge", "rising water", "swept", "current", "surge",
        ],
        first_aid: Some(
            "Move to highest ground immediately. Never walk through fast-moving water. Signal from roof. Do not re-enter floodwater — may be electrified.",
        ),
    },
    TriageRule {
        category: Category::Missing,
        keywords: &[
            "missing", "lost", "cant find", "whereabouts", "disappeared", "gone", "separated",
        ],
        first_aid: Some(
            "Stay at last known location if safe. Use whistle, torch flash, or bang metal to signal. Do not wander alone at night.",
        ),
    },
    TriageRule {
        category: Category::FoodWater,
        keywords: &[
            "food", "water", "thirst", "hungry", "starv", "supply", "ration", "dehydrat",
            "no water",
        ],
        first_aid: Some(
            "Ration water — minimum 0.5L/day. Avoid exertion. Do not drink floodwater. Signal for supply drop.",
        ),
    },
    TriageRule {
        category: Category::Safe,
        keywords: &[
            "safe", "okay", "fine", "reached", "evacuate", "secure", "assembly", "alright",
            "shelter",
        ],
        first_aid: None,
    },
];

const GENERAL_FIRST_AID: &str =
    "Stay visible and conserve phone battery. Signal with torch or whistle every 2 minutes.";

/// Keyword-driven categorization plus first-aid guidance lookup.
pub fn classify(message: &str) -> (Category, Option<&'static str>) {
    let lower = message.to_lowercase();
    for rule in TRIAGE_RULES {
        if rule.keywords.iter().any(|kw| lower.contains(kw)) {
            return (rule.category, rule.first_aid);
        }
    }
    (Category::General, Some(GENERAL_FIRST_AID))
}
