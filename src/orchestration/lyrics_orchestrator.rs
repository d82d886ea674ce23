//! # Generate-Validate-Regenerate Loop
//!
//! Produces structured lyrics for a paid order. Each attempt calls the
//! generation provider, parses the output, and runs the full rule set; a
//! failing attempt feeds its violations back as a corrective instruction on
//! the next prompt. The loop is bounded by `generation.max_attempts`, and
//! temperature never changes between attempts.
//!
//! When no attempt passes every rule, the attempt with the fewest violations
//! wins (earliest attempt on ties) and ships with a warning, rather than
//! failing the order outright.

use super::PipelineContext;
use crate::analysis::{
    classify_addressing, extract_proper_names, AddresseeNumber, AddressingProfile, Gender,
};
use crate::clients::{LyricsGenerator, LyricsRequest};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::models::{Job, LyricsApproval, NewLyricsApproval, Order, Quiz};
use crate::validation::{parse_lyrics, validate_lyrics, ParsedLyrics, ValidationInput, ValidationReport};
use chrono::{Duration, Utc};
use crate::resilience::{with_retry, with_timeout, RetryPolicy};
use std::time::Duration as StdDuration;
use tracing::{info, warn};

/// Review window stamped on each new approval; a pending approval past its
/// `expires_at` is overdue for operator triage.
const APPROVAL_WINDOW_HOURS: i64 = 72;

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub lyrics: String,
    pub parsed: ParsedLyrics,
    pub report: ValidationReport,
}

/// Run the bounded loop against a generator. Pure orchestration over the
/// injected client; no storage access, so it is directly testable with a
/// stub generator.
pub async fn generate_validated_lyrics(
    generator: &dyn LyricsGenerator,
    config: &GenerationConfig,
    quiz: &Quiz,
) -> Result<GenerationOutcome> {
    let brief_text = quiz.narrative_text();
    let honored_names = extract_proper_names(&quiz.recipient);
    let mut brief_names = extract_proper_names(&brief_text);
    for name in &honored_names {
        if !brief_names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            brief_names.push(name.clone());
        }
    }
    let profile = classify_addressing(&brief_text, &quiz.recipient, &honored_names);
    let brief_lower = format!("{}\n{}", quiz.recipient, brief_text).to_lowercase();

    let mut corrective: Option<String> = None;
    let mut best: Option<GenerationOutcome> = None;

    for attempt in 1..=config.max_attempts.max(1) {
        let request = LyricsRequest {
            prompt: build_prompt(quiz, &honored_names, &profile, corrective.as_deref()),
            style: quiz.style.clone(),
            tone: quiz.tone.clone(),
            temperature: config.temperature,
        };

        let timeout = StdDuration::from_millis(config.request_timeout_ms);
        let generated = with_retry("lyrics_generation", &RetryPolicy::upstream(), || async {
            with_timeout("lyrics_generation", timeout, generator.generate(&request)).await
        })
        .await;

        let raw = match generated {
            Ok(raw) => raw,
            Err(err) if best.is_some() => {
                // A later attempt failed at the transport layer; the earlier
                // content is still usable.
                warn!(attempt, error = %err, "generation attempt failed, keeping best prior attempt");
                break;
            }
            Err(err) => return Err(err),
        };

        let parsed = parse_lyrics(&raw);
        let mut report = validate_lyrics(&ValidationInput {
            lyrics: &parsed,
            honored_names: &honored_names,
            brief_names: &brief_names,
            addressee_number: profile.number,
            brief_text: &brief_lower,
        });
        report.attempt = attempt;

        if report.valid {
            info!(attempt, "lyrics passed validation");
            return Ok(GenerationOutcome {
                lyrics: raw,
                parsed,
                report,
            });
        }

        info!(
            attempt,
            violations = report.violation_count(),
            "lyrics failed validation"
        );
        corrective = Some(report.corrective_instruction());

        let outcome = GenerationOutcome {
            lyrics: raw,
            parsed,
            report,
        };
        // Strictly-fewer keeps the earliest attempt on ties.
        let improves = best
            .as_ref()
            .map(|b| outcome.report.violation_count() < b.report.violation_count())
            .unwrap_or(true);
        if improves {
            best = Some(outcome);
        }
    }

    let mut outcome = best.ok_or_else(|| {
        Error::internal("generation loop produced neither lyrics nor an error")
    })?;
    outcome.report.warnings.push(format!(
        "no attempt passed validation; shipping attempt {} with {} violation(s)",
        outcome.report.attempt,
        outcome.report.violation_count()
    ));
    Ok(outcome)
}

/// The single prompt template. Regeneration changes only the appended
/// corrective instruction.
fn build_prompt(
    quiz: &Quiz,
    honored_names: &[String],
    profile: &AddressingProfile,
    corrective: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Write a personalized song for {recipient}.\n\
         Style: {style}.\n",
        recipient = quiz.recipient,
        style = quiz.style,
    );
    if let Some(tone) = &quiz.tone {
        prompt.push_str(&format!("Tone: {tone}.\n"));
    }
    if !honored_names.is_empty() {
        prompt.push_str(&format!(
            "The honored name(s): {}. Use them only in chorus sections.\n",
            honored_names.join(", ")
        ));
    }
    prompt.push_str(match profile.number {
        AddresseeNumber::Collective => {
            "Address the recipients collectively, in second person, never in third person.\n"
        }
        AddresseeNumber::Singular => {
            "Address the recipient directly in second person, never in third person.\n"
        }
    });
    prompt.push_str(match profile.gender {
        Gender::Feminine => "Where the song needs gendered wording, the subject is a woman.\n",
        Gender::Masculine => "Where the song needs gendered wording, the subject is a man.\n",
        Gender::Neutral => "Keep any gendered wording neutral.\n",
    });
    prompt.push_str(
        "Structure the song with bracketed headers, in exactly this order: \
         [Intro], [Verse 1], [Chorus], [Verse 2], [Chorus 2], [Bridge], \
         [Verse 3], [Final Chorus], [Outro].\n",
    );
    prompt.push_str("The brief:\n");
    prompt.push_str(&quiz.narrative_text());
    if let Some(instruction) = corrective {
        prompt.push_str("\n\n");
        prompt.push_str(instruction);
    }
    prompt
}

/// The storage-facing wrapper: generate for a job, persist the lyrics and
/// section structure, and open the review approval. Called after payment
/// and from the internal regeneration endpoint.
pub async fn run_generation(ctx: &PipelineContext, order: &Order, job: &Job) -> Result<()> {
    Job::set_status(&ctx.pool, job.id, "processing").await?;

    let quiz_id = order
        .quiz_id
        .ok_or_else(|| Error::state_inconsistency("paid order has no quiz attached"))?;
    let quiz = Quiz::find_by_id(&ctx.pool, quiz_id)
        .await?
        .ok_or_else(|| Error::state_inconsistency("order references a missing quiz"))?;

    let outcome =
        match generate_validated_lyrics(ctx.lyrics.as_ref(), &ctx.config.generation, &quiz).await {
            Ok(outcome) => outcome,
            Err(err) => {
                Job::mark_failed(&ctx.pool, job.id, &err.to_string()).await?;
                return Err(err);
            }
        };

    Job::set_lyrics(
        &ctx.pool,
        job.id,
        &outcome.lyrics,
        &outcome.parsed.to_sections_json(),
    )
    .await?;

    let approval = LyricsApproval::open(
        &ctx.pool,
        &NewLyricsApproval {
            order_id: order.id,
            job_id: job.id,
            expires_at: Utc::now() + Duration::hours(APPROVAL_WINDOW_HOURS),
        },
    )
    .await?;

    info!(
        order_id = order.id,
        job_id = job.id,
        approval_id = approval.id,
        attempt = outcome.report.attempt,
        valid = outcome.report.valid,
        "lyrics generated and queued for review"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Returns canned responses in order, counting calls.
    struct ScriptedGenerator {
        responses: Mutex<Vec<Result<String>>>,
        calls: AtomicU32,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LyricsGenerator for ScriptedGenerator {
        async fn generate(&self, request: &LyricsRequest) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.prompts.lock().unwrap().push(request.prompt.clone());
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(Error::upstream("script exhausted"));
            }
            responses.remove(0)
        }
    }

    fn quiz() -> Quiz {
        Quiz {
            id: 1,
            recipient: "Maria".into(),
            style: "ballad".into(),
            tone: Some("warm".into()),
            message: Some("You carried me through the hardest winter".into()),
            occasion: None,
            story: None,
            details: None,
            voice_preference: None,
            created_at: Utc::now(),
        }
    }

    fn config() -> GenerationConfig {
        GenerationConfig {
            max_attempts: 3,
            request_timeout_ms: 1_000,
            ..GenerationConfig::default()
        }
    }

    fn section(label: &str, body: &str) -> String {
        format!("[{label}]\n{body}\n")
    }

    /// A complete nine-section song that passes every rule for the fixture
    /// quiz above.
    fn valid_lyrics() -> String {
        let mut out = String::new();
        out.push_str(&section("Intro", "A quiet melody begins for you"));
        out.push_str(&section("Verse 1", "You carried me through the hardest winter"));
        out.push_str(&section("Chorus", "Maria, this song is yours tonight"));
        out.push_str(&section("Verse 2", "Every morning you found the light"));
        out.push_str(&section("Chorus 2", "Maria, this song is yours tonight"));
        out.push_str(&section("Bridge", "And the winter turned to spring"));
        out.push_str(&section("Verse 3", "Now the garden blooms again for you"));
        out.push_str(&section("Final Chorus", "Maria, this song is yours tonight"));
        out.push_str(&section("Outro", "The melody fades but you remain"));
        out
    }

    /// Same song with the bridge removed (one violation).
    fn lyrics_missing_bridge() -> String {
        valid_lyrics().replace("[Bridge]\nAnd the winter turned to spring\n", "")
    }

    /// Two violations: bridge missing and a banned filler phrase.
    fn lyrics_missing_bridge_with_filler() -> String {
        lyrics_missing_bridge() + "\n[Outro]\nla la la"
    }

    #[tokio::test]
    async fn first_valid_attempt_short_circuits() {
        let generator = ScriptedGenerator::new(vec![Ok(valid_lyrics())]);
        let outcome = generate_validated_lyrics(&generator, &config(), &quiz())
            .await
            .unwrap();
        assert!(outcome.report.valid);
        assert_eq!(outcome.report.attempt, 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_attempt_regenerates_with_corrective_instruction() {
        let generator =
            ScriptedGenerator::new(vec![Ok(lyrics_missing_bridge()), Ok(valid_lyrics())]);
        let outcome = generate_validated_lyrics(&generator, &config(), &quiz())
            .await
            .unwrap();
        assert!(outcome.report.valid);
        assert_eq!(outcome.report.attempt, 2);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(!prompts[0].contains("missing_section"));
        assert!(prompts[1].contains("missing_section:bridge"));
    }

    #[tokio::test]
    async fn loop_is_bounded_at_max_attempts() {
        let generator = ScriptedGenerator::new(vec![
            Ok(lyrics_missing_bridge()),
            Ok(lyrics_missing_bridge()),
            Ok(lyrics_missing_bridge()),
            Ok(valid_lyrics()),
        ]);
        let outcome = generate_validated_lyrics(&generator, &config(), &quiz())
            .await
            .unwrap();
        // Exactly max_attempts calls, never a fourth.
        assert_eq!(generator.calls.load(Ordering::SeqCst), 3);
        assert!(!outcome.report.valid);
        assert!(!outcome.report.warnings.is_empty());
    }

    #[tokio::test]
    async fn fewest_violations_wins_with_earliest_tiebreak() {
        let generator = ScriptedGenerator::new(vec![
            Ok(lyrics_missing_bridge_with_filler()),
            Ok(lyrics_missing_bridge()),
            Ok(lyrics_missing_bridge()),
        ]);
        let outcome = generate_validated_lyrics(&generator, &config(), &quiz())
            .await
            .unwrap();
        assert!(!outcome.report.valid);
        // Attempts 2 and 3 tie at one violation; the earlier one is kept.
        assert_eq!(outcome.report.attempt, 2);
        assert_eq!(outcome.report.violation_count(), 1);
    }

    #[tokio::test]
    async fn transport_failure_after_content_keeps_best_attempt() {
        let generator = ScriptedGenerator::new(vec![
            Ok(lyrics_missing_bridge()),
            Err(Error::upstream("provider down")),
        ]);
        let outcome = generate_validated_lyrics(&generator, &config(), &quiz())
            .await
            .unwrap();
        assert_eq!(outcome.report.attempt, 1);
        assert!(!outcome.report.warnings.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_with_no_content_propagates() {
        let generator = ScriptedGenerator::new(vec![Err(Error::upstream("provider down"))]);
        let err = generate_validated_lyrics(&generator, &config(), &quiz())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
    }

    #[test]
    fn prompt_carries_names_and_addressing() {
        let q = quiz();
        let names = vec!["Maria".to_string()];
        let profile = AddressingProfile {
            gender: Gender::Feminine,
            number: AddresseeNumber::Singular,
        };
        let prompt = build_prompt(&q, &names, &profile, None);
        assert!(prompt.contains("Maria"));
        assert!(prompt.contains("second person"));
        assert!(prompt.contains("[Final Chorus]"));
    }

    #[test]
    fn prompt_reflects_the_gender_verdict() {
        let q = quiz();
        let names = vec!["Maria".to_string()];
        let profile = |gender| AddressingProfile {
            gender,
            number: AddresseeNumber::Singular,
        };

        let feminine = build_prompt(&q, &names, &profile(Gender::Feminine), None);
        assert!(feminine.contains("the subject is a woman"));

        let masculine = build_prompt(&q, &names, &profile(Gender::Masculine), None);
        assert!(masculine.contains("the subject is a man"));

        let neutral = build_prompt(&q, &names, &profile(Gender::Neutral), None);
        assert!(neutral.contains("gendered wording neutral"));
    }
}
