//! Built-in pattern catalog
//!
//! The default catalog shipped with the crate. Callers can replace it with
//! their own JSON document via `PatternRegistry::from_path`; the schema is
//! an array of `{name, regex, weight, category, modifier_tags}` entries.

/// Default catalog as a JSON document
///
/// Positive weights mark signal (medical, identity, family, preferences);
/// negative weights mark conversational noise. Medical-family entries carry
/// the `severity_amplifiable` tag consulted by the severity modifier.
pub const DEFAULT_CATALOG: &str = r#"[
  {"name": "allergy", "regex": "\\ballerg(?:y|ies|ic)\\b", "weight": 15, "category": "medical", "modifier_tags": ["severity_amplifiable"]},
  {"name": "peanut_allergy", "regex": "\\bpeanut\\s+allerg(?:y|ies|ic)\\b", "weight": 9, "category": "allergy", "modifier_tags": ["severity_amplifiable"]},
  {"name": "shellfish_allergy", "regex": "\\bshellfish\\s+allerg(?:y|ies|ic)\\b", "weight": 9, "category": "allergy", "modifier_tags": ["severity_amplifiable"]},
  {"name": "nut_allergy", "regex": "\\b(?:tree\\s+)?nut\\s+allerg(?:y|ies|ic)\\b", "weight": 9, "category": "allergy", "modifier_tags": ["severity_amplifiable"]},
  {"name": "medical_condition", "regex": "\\b(medical condition|diagnosed|disease|disorder|syndrome)\\b", "weight": 15, "category": "medical", "modifier_tags": ["severity_amplifiable"]},
  {"name": "mental_health", "regex": "\\b(panic attack|anxiety|ptsd|trauma|phobia|depression)\\b", "weight": 20, "category": "mental_health", "modifier_tags": ["severity_amplifiable"]},
  {"name": "medical_treatment", "regex": "\\b(medication|prescription|treatment|therapy)\\b", "weight": 12, "category": "medical_treatment", "modifier_tags": ["severity_amplifiable"]},
  {"name": "medical_equipment", "regex": "\\b(epipen|inhaler|insulin pump|pacemaker)\\b", "weight": 8, "category": "medical_equipment", "modifier_tags": ["severity_amplifiable"]},
  {"name": "chronic_condition", "regex": "\\b(diabetes|asthma|epilepsy|cancer|migraines?)\\b", "weight": 8, "category": "medical", "modifier_tags": ["severity_amplifiable"]},
  {"name": "lactose_intolerance", "regex": "\\b(lactose|gluten)\\s+intoleran(?:t|ce)\\b", "weight": 8, "category": "medical", "modifier_tags": ["severity_amplifiable"]},
  {"name": "emergency", "regex": "\\b(emergency|urgent|critical|life-threatening)\\b", "weight": 25, "category": "emergency", "modifier_tags": ["severity_amplifiable"]},
  {"name": "safety_concern", "regex": "\\b(afraid|fear|fearful|danger|unsafe)\\b", "weight": 18, "category": "safety_concern", "modifier_tags": ["severity_amplifiable"]},
  {"name": "fear_expression", "regex": "\\b(terrifies|terrified|terrifying|scares|scared|frightens|frightened|frightening)\\b", "weight": 12, "category": "safety_concern"},
  {"name": "identity_name", "regex": "\\b(my name is|i'm called|call me)\\b", "weight": 20, "category": "identity"},
  {"name": "identity_role", "regex": "\\b(i am|i'm) (a |an )?\\w+ (person|man|woman)\\b", "weight": 15, "category": "identity"},
  {"name": "personal_info", "regex": "\\b(born|birthday|age \\d+|years old)\\b", "weight": 10, "category": "personal_info"},
  {"name": "family_member", "regex": "\\bmy (wife|husband|partner|spouse|child|son|daughter|mother|father|parent|brother|sister)\\b", "weight": 14, "category": "family"},
  {"name": "relationship_status", "regex": "\\b(married|divorced|widowed|engaged)\\b", "weight": 12, "category": "relationship_status"},
  {"name": "grief", "regex": "\\b(died|death|passed away|funeral|grieving)\\b", "weight": 18, "category": "grief"},
  {"name": "pregnancy", "regex": "\\b(pregnant|expecting a baby|newborn)\\b", "weight": 16, "category": "major_life_event"},
  {"name": "job_loss", "regex": "\\b(job loss|fired|laid off|unemployed)\\b", "weight": 14, "category": "major_life_event"},
  {"name": "strong_preference", "regex": "\\b(hate|love|adore|can't stand|despise)\\b", "weight": 12, "category": "preference"},
  {"name": "dietary", "regex": "\\b(vegetarian|vegan|kosher|halal|gluten[- ]free)\\b", "weight": 13, "category": "dietary"},
  {"name": "dietary_restriction", "regex": "\\b(can't|cannot|don't|no longer|stopped) (eat|have|consume)\\b", "weight": 10, "category": "dietary_restriction"},
  {"name": "life_change", "regex": "\\b(used to|no longer|stopped|quit|gave up)\\b", "weight": 12, "category": "life_change"},
  {"name": "past_status", "regex": "\\b(was|were) (married|employed|working|living)\\b", "weight": 12, "category": "past_status"},
  {"name": "occasional_behavior", "regex": "\\b(sometimes|occasionally|rarely) (drink|eat|do|go)\\b", "weight": 8, "category": "occasional_behavior"},
  {"name": "goal", "regex": "\\b(my goal|plan to|want to|need to|trying to)\\b", "weight": 8, "category": "goal"},
  {"name": "preference_mild", "regex": "\\b(prefer|enjoy|interested in|dislike)\\b", "weight": 6, "category": "preference"},
  {"name": "logistics", "regex": "\\b(meeting|appointment|schedule|calendar)\\b", "weight": 7, "category": "logistics"},
  {"name": "contact_info", "regex": "\\b(address|phone number|email|emergency contact)\\b", "weight": 9, "category": "contact_info"},
  {"name": "career", "regex": "\\b(work at|my job|career|profession)\\b", "weight": 10, "category": "career"},
  {"name": "residence", "regex": "\\b(live in|moved to|relocated)\\b", "weight": 9, "category": "location"},
  {"name": "education", "regex": "\\b(kindergarten|elementary|preschool|college|university)\\b", "weight": 7, "category": "education"},
  {"name": "sleep_disturbance", "regex": "\\b(nightmares?|insomnia|night terrors?|sleepwalking)\\b", "weight": 5, "category": "health"},
  {"name": "named_event", "regex": "\\b(birthday party|wedding|anniversary|graduation)\\b", "weight": 8, "category": "event"},
  {"name": "greeting", "regex": "\\b(hello|hi|hey|goodbye|bye|see you)\\b", "weight": -5, "category": "greeting"},
  {"name": "confirmation", "regex": "\\b(yes|yeah|yep|okay|ok|sure|maybe|perhaps)\\b", "weight": -3, "category": "confirmation"},
  {"name": "filler", "regex": "\\b(um|uh|you know|i mean)\\b", "weight": -8, "category": "filler"},
  {"name": "pleasantry", "regex": "\\b(thanks|thank you|please|you're welcome)\\b", "weight": -4, "category": "pleasantry"},
  {"name": "question_word", "regex": "\\b(what|when|where|why|how)\\b", "weight": -2, "category": "question_word"},
  {"name": "smalltalk_weather", "regex": "\\b(weather|sunny|raining|forecast)\\b", "weight": -3, "category": "smalltalk"}
]"#;
