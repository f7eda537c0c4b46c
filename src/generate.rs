//! Synthetic patient-narrative generator.
//!
//! Samples a random patient profile and a sheet of health facts, then asks
//! the model — in character, at a creative temperature — to recount the day
//! those facts describe. The sampling RNG is injected so tests can pin it;
//! prompt assembly is deterministic given the sampled brief.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::ollama::{ClientError, GenerationOptions, LlmClient};

const GIRL_NAMES: &[&str] = &[
    "Olivia", "Emma", "Charlotte", "Amelia", "Sophia", "Isabella", "Mia", "Evelyn", "Harper",
    "Luna",
];
const BOY_NAMES: &[&str] = &[
    "Liam", "Noah", "Oliver", "Elijah", "James", "William", "Benjamin", "Lucas", "Henry",
    "Theodore",
];
const PROFESSIONS: &[&str] = &[
    "Teacher", "Doctor", "Engineer", "Artist", "Chef", "Software Developer", "Nurse", "Writer",
    "Accountant", "Electrician",
];
const SYMPTOMS: &[&str] = &[
    "headache", "nausea", "dizziness", "fatigue", "stomach pain", "bloating", "cramps",
    "heartburn", "constipation",
];
const FOODS: &[&str] = &[
    "toast and eggs",
    "a chicken salad",
    "some pasta with pesto",
    "salmon with broccoli",
    "yoghurt with fruit",
    "a banana and a coffee",
    "a ham and cheese sandwich",
    "a bowl of soup",
];
const MEDICATIONS: &[&str] = &[
    "Ibuprofen",
    "Paracetamol",
    "an Antacid tablet",
    "my daily Vitamin D supplement",
    "some allergy medication",
];
const STOOL_TYPES: &[&str] = &["a bit hard", "normal", "a bit soft", "quite loose", "watery"];
const SEVERITIES: &[&str] = &[
    "mild", "low", "slight", "moderate", "average", "quite severe", "high", "intense",
];
const MEAL_TIMES: &[&str] = &["breakfast", "brunch", "lunch", "a snack", "dinner"];
const TIMES: &[&str] = &[
    "in the early morning",
    "in the morning",
    "around mid-morning",
    "around lunchtime",
    "in the afternoon",
    "in the mid-afternoon",
    "in the early evening",
    "in the evening",
    "late in the evening",
    "just before I went to bed",
];
const SPEECH_STYLES: &[&str] = &[
    "a bit formal",
    "casual",
    "a bit rambling",
    "concise",
    "a little hesitant",
    "frustrated",
    "anxious",
    "exhausted",
];

/// Errors raised by the generator. Never affects an extraction in
/// progress or a displayed record.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Failed to generate a random narrative from the model.")]
    Transport(#[from] ClientError),
}

/// A sampled persona plus the facts the narrative must contain.
#[derive(Debug, Clone)]
pub struct NarrativeBrief {
    pub name: String,
    pub age: u8,
    pub gender: &'static str,
    pub profession: &'static str,
    pub speech_style: &'static str,
    /// (symptom, severity, time of day)
    pub symptoms: Vec<(String, String, String)>,
    /// (meal slot, food)
    pub meals: Vec<(String, String)>,
    /// (consistency, time of day)
    pub stools: Vec<(String, String)>,
    /// (level, time of day)
    pub stress: Vec<(String, String)>,
    /// (medication, time of day)
    pub medications: Vec<(String, String)>,
    /// Always given to the persona, 4-10.
    pub sleep_score: u8,
    pub on_period: bool,
}

/// Sample a brief: 0-3 symptoms, 1-3 meals, 0-2 of each of stools, stress
/// notes, and medications, a 4-10 sleep score, and a 25% period chance when
/// the persona is female.
pub fn sample_brief<R: Rng>(rng: &mut R) -> NarrativeBrief {
    let gender = if rng.gen_bool(0.5) { "Female" } else { "Male" };
    let names = if gender == "Female" { GIRL_NAMES } else { BOY_NAMES };
    let name = pick(names, rng);
    let age = rng.gen_range(18..=70);
    let profession = *PROFESSIONS.choose(rng).unwrap_or(&PROFESSIONS[0]);
    let speech_style = *SPEECH_STYLES.choose(rng).unwrap_or(&SPEECH_STYLES[0]);

    let symptom_count = rng.gen_range(0..=3);
    let symptoms = subset(SYMPTOMS, symptom_count, rng)
        .into_iter()
        .map(|symptom| (symptom, pick(SEVERITIES, rng), pick(TIMES, rng)))
        .collect();

    let meal_count = rng.gen_range(1..=3);
    let meals = subset(FOODS, meal_count, rng)
        .into_iter()
        .enumerate()
        .map(|(slot, food)| (MEAL_TIMES.get(slot).unwrap_or(&"a meal").to_string(), food))
        .collect();

    let stool_count = rng.gen_range(0..=2);
    let stools = subset(STOOL_TYPES, stool_count, rng)
        .into_iter()
        .map(|consistency| (consistency, pick(TIMES, rng)))
        .collect();

    let stress_count = rng.gen_range(0..=2);
    let stress = subset(SEVERITIES, stress_count, rng)
        .into_iter()
        .map(|level| (level, pick(TIMES, rng)))
        .collect();

    let medication_count = rng.gen_range(0..=2);
    let medications = subset(MEDICATIONS, medication_count, rng)
        .into_iter()
        .map(|medication| (medication, pick(TIMES, rng)))
        .collect();

    let sleep_score = rng.gen_range(4..=10);
    let on_period = gender == "Female" && rng.gen_bool(0.25);

    NarrativeBrief {
        name,
        age,
        gender,
        profession,
        speech_style,
        symptoms,
        meals,
        stools,
        stress,
        medications,
        sleep_score,
        on_period,
    }
}

fn pick<R: Rng>(list: &[&str], rng: &mut R) -> String {
    list.choose(rng).copied().unwrap_or_default().to_string()
}

fn subset<R: Rng>(list: &[&str], count: usize, rng: &mut R) -> Vec<String> {
    list.choose_multiple(rng, count.min(list.len()))
        .map(|s| s.to_string())
        .collect()
}

/// Persona instruction: who is talking and how.
pub fn persona_instruction(brief: &NarrativeBrief) -> String {
    format!(
        "You are {name}, a {age}-year-old {gender} {profession}.\n\
         You are in a healthcare appointment recounting your day yesterday to a clinician. \
         You speak in a {style} manner.\n\
         You must act as the patient. Provide only the patient's narrative. \
         Do NOT describe actions or use asterisks. Do NOT ask any questions.\n\
         Your response should be a single block of text.\n\
         In your narrative, you MUST naturally include ALL of the following information.",
        name = brief.name,
        age = brief.age,
        gender = brief.gender,
        profession = brief.profession,
        style = brief.speech_style,
    )
}

/// Fact sheet: every sampled data point under a section heading, so the
/// persona has nothing to invent and nothing to drop.
pub fn fact_sheet(brief: &NarrativeBrief) -> String {
    let mut parts = vec![
        "Here is the health information you need to include in your story about yesterday:"
            .to_string(),
    ];

    if !brief.symptoms.is_empty() {
        parts.push("\n\n**Symptoms:**".to_string());
        for (symptom, severity, time) in &brief.symptoms {
            parts.push(format!("\n- You experienced a {severity} {symptom} {time}."));
        }
    }

    if !brief.meals.is_empty() {
        parts.push("\n\n**Diet:**".to_string());
        for (slot, food) in &brief.meals {
            parts.push(format!("\n- For your {slot}, you ate {food}."));
        }
    }

    if !brief.stools.is_empty() {
        parts.push("\n\n**Digestion:**".to_string());
        for (consistency, time) in &brief.stools {
            parts.push(format!(
                "\n- You had a bowel movement that was {consistency} {time}."
            ));
        }
    }

    if !brief.stress.is_empty() {
        parts.push("\n\n**Stress Levels:**".to_string());
        for (level, time) in &brief.stress {
            parts.push(format!("\n- You experienced a {level} stress level {time}."));
        }
    }

    if !brief.medications.is_empty() {
        parts.push("\n\n**Medication:**".to_string());
        for (medication, time) in &brief.medications {
            parts.push(format!("\n- You took {medication} {time}."));
        }
    }

    parts.push(format!(
        "\n\n**Sleep:**\n- Your sleep last night was a {}/10.",
        brief.sleep_score
    ));

    if brief.on_period {
        parts.push("\n- You are on your period.".to_string());
    }

    parts.push(
        "\n\nNow, please write the full, detailed patient narrative in your natural manner, \
         incorporating all of the points above."
            .to_string(),
    );

    parts.concat()
}

/// Synthetic-narrative producer. Independent of extraction; a failure
/// here leaves any displayed record untouched.
pub struct NarrativeGenerator {
    llm: Box<dyn LlmClient + Send + Sync>,
    model: String,
}

impl NarrativeGenerator {
    pub fn new(llm: Box<dyn LlmClient + Send + Sync>, model: &str) -> Self {
        Self {
            llm,
            model: model.to_string(),
        }
    }

    /// Generate one narrative with a fresh thread-local RNG.
    pub fn generate(&self) -> Result<String, GenerationError> {
        self.generate_with_rng(&mut rand::thread_rng())
    }

    /// Generate one narrative from an injected RNG.
    pub fn generate_with_rng<R: Rng>(&self, rng: &mut R) -> Result<String, GenerationError> {
        let brief = sample_brief(rng);
        tracing::info!(
            persona = %brief.name,
            symptoms = brief.symptoms.len(),
            meals = brief.meals.len(),
            "Generating synthetic narrative"
        );

        let text = self.llm.generate(
            &self.model,
            &fact_sheet(&brief),
            &persona_instruction(&brief),
            &GenerationOptions::creative(),
        )?;

        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ollama::MockLlmClient;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    // ── Sampling bounds ──

    #[test]
    fn sampled_briefs_stay_within_bounds() {
        for seed in 0..50 {
            let brief = sample_brief(&mut seeded(seed));
            assert!((18..=70).contains(&brief.age), "seed {seed}");
            assert!(brief.symptoms.len() <= 3);
            assert!((1..=3).contains(&brief.meals.len()));
            assert!(brief.stools.len() <= 2);
            assert!(brief.stress.len() <= 2);
            assert!(brief.medications.len() <= 2);
            assert!((4..=10).contains(&brief.sleep_score));
            if brief.gender == "Male" {
                assert!(!brief.on_period);
            }
        }
    }

    #[test]
    fn names_match_sampled_gender() {
        for seed in 0..20 {
            let brief = sample_brief(&mut seeded(seed));
            let expected = if brief.gender == "Female" { GIRL_NAMES } else { BOY_NAMES };
            assert!(expected.contains(&brief.name.as_str()));
        }
    }

    #[test]
    fn meal_slots_follow_the_fixed_order() {
        // A brief with three meals uses breakfast, brunch, lunch in order.
        let brief = (0..)
            .map(|seed| sample_brief(&mut seeded(seed)))
            .find(|b| b.meals.len() == 3)
            .unwrap();
        let slots: Vec<&str> = brief.meals.iter().map(|(slot, _)| slot.as_str()).collect();
        assert_eq!(slots, vec!["breakfast", "brunch", "lunch"]);
    }

    #[test]
    fn same_seed_same_brief() {
        let a = sample_brief(&mut seeded(7));
        let b = sample_brief(&mut seeded(7));
        assert_eq!(a.name, b.name);
        assert_eq!(a.sleep_score, b.sleep_score);
        assert_eq!(a.symptoms, b.symptoms);
    }

    // ── Prompt assembly ──

    fn fixed_brief() -> NarrativeBrief {
        NarrativeBrief {
            name: "Olivia".to_string(),
            age: 34,
            gender: "Female",
            profession: "Chef",
            speech_style: "casual",
            symptoms: vec![(
                "headache".to_string(),
                "mild".to_string(),
                "in the morning".to_string(),
            )],
            meals: vec![("breakfast".to_string(), "toast and eggs".to_string())],
            stools: vec![("normal".to_string(), "in the morning".to_string())],
            stress: vec![("high".to_string(), "in the afternoon".to_string())],
            medications: vec![("Ibuprofen".to_string(), "in the evening".to_string())],
            sleep_score: 6,
            on_period: true,
        }
    }

    #[test]
    fn persona_instruction_names_the_patient() {
        let instruction = persona_instruction(&fixed_brief());
        assert!(instruction.contains("You are Olivia, a 34-year-old Female Chef."));
        assert!(instruction.contains("casual manner"));
        assert!(instruction.contains("Provide only the patient's narrative"));
    }

    #[test]
    fn fact_sheet_contains_every_sampled_fact() {
        let sheet = fact_sheet(&fixed_brief());
        assert!(sheet.contains("You experienced a mild headache in the morning."));
        assert!(sheet.contains("For your breakfast, you ate toast and eggs."));
        assert!(sheet.contains("a bowel movement that was normal in the morning."));
        assert!(sheet.contains("a high stress level in the afternoon."));
        assert!(sheet.contains("You took Ibuprofen in the evening."));
        assert!(sheet.contains("Your sleep last night was a 6/10."));
        assert!(sheet.contains("You are on your period."));
    }

    #[test]
    fn fact_sheet_omits_empty_sections() {
        let mut brief = fixed_brief();
        brief.symptoms.clear();
        brief.on_period = false;
        let sheet = fact_sheet(&brief);
        assert!(!sheet.contains("**Symptoms:**"));
        assert!(!sheet.contains("period"));
        assert!(sheet.contains("**Sleep:**"));
    }

    // ── Generator ──

    #[test]
    fn generator_uses_creative_sampling_and_trims() {
        let mock = std::sync::Arc::new(
            MockLlmClient::new().with_generate_response("  So yesterday started rough...  \n"),
        );
        let generator = NarrativeGenerator::new(Box::new(mock.clone()), "llama3.1:8b");
        let text = generator.generate_with_rng(&mut seeded(3)).unwrap();
        assert_eq!(text, "So yesterday started rough...");

        let calls = mock.generate_requests.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "llama3.1:8b");
        assert!(calls[0].1.starts_with("Here is the health information"));
        assert!(calls[0].2.starts_with("You are "));
        assert_eq!(calls[0].3, 0.8);
    }

    #[test]
    fn transport_failure_becomes_generation_error() {
        let mock =
            MockLlmClient::new().with_generate_error(ClientError::Timeout(300));
        let generator = NarrativeGenerator::new(Box::new(mock), "llama3.1:8b");
        let error = generator.generate_with_rng(&mut seeded(1)).unwrap_err();
        assert!(matches!(error, GenerationError::Transport(_)));
        assert_eq!(
            error.to_string(),
            "Failed to generate a random narrative from the model."
        );
    }
}
