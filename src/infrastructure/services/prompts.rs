//! Prompt construction for the evaluation and narrative completions

use crate::domain::feedback::{FeedbackEvaluation, FeedbackType, ValidatedFeedbackRequest};
use crate::domain::Message;

const DRILL_SYSTEM_PROMPT: &str = "You are an experienced management consulting interviewer \
reviewing a candidate's answer to a focused practice drill. Judge structure, clarity, \
quantitative rigor and business judgment. Be specific and constructive.";

const SIMULATION_SYSTEM_PROMPT: &str = "You are an experienced management consulting interviewer \
reviewing a full case interview simulation. Judge how the candidate scoped the problem, built \
and tested hypotheses, handled data and synthesized a recommendation. Be specific and constructive.";

const EVALUATION_FORMAT: &str = r#"Respond with a single JSON object and nothing else, using this shape:
{
  "overallScore": <number from 0 to 100>,
  "strengths": [<string>, ...],
  "improvements": [<string>, ...],
  "feedbackPoints": [
    {"category": <string>, "severity": "CRITICAL" | "IMPORTANT" | "SUGGESTION", "message": <string>, "suggestion": <string>}
  ]
}"#;

fn system_prompt(feedback_type: FeedbackType) -> &'static str {
    match feedback_type {
        FeedbackType::Drill => DRILL_SYSTEM_PROMPT,
        FeedbackType::Simulation => SIMULATION_SYSTEM_PROMPT,
    }
}

fn describe_response(request: &ValidatedFeedbackRequest) -> String {
    let mut text = format!("Candidate response:\n\"\"\"\n{}\n\"\"\"", request.content);

    if !request.metrics.is_empty() {
        text.push_str("\n\nRecorded metrics:");
        for metric in &request.metrics {
            text.push_str(&format!("\n- {}: {}", metric.name, metric.value));
        }
    }

    text
}

/// Messages asking for the structured evaluation
pub fn evaluation_messages(request: &ValidatedFeedbackRequest) -> Vec<Message> {
    vec![
        Message::system(system_prompt(request.feedback_type)),
        Message::user(format!(
            "Evaluate this {} attempt.\n\n{}\n\n{}",
            request.feedback_type.as_str().to_lowercase(),
            describe_response(request),
            EVALUATION_FORMAT
        )),
    ]
}

/// Messages asking for the narrative summary of an evaluation
pub fn narrative_messages(
    request: &ValidatedFeedbackRequest,
    evaluation: &FeedbackEvaluation,
) -> Vec<Message> {
    let mut assessment = format!("Overall score: {}/100", evaluation.score());

    if !evaluation.strengths.is_empty() {
        assessment.push_str("\nStrengths:");
        for strength in &evaluation.strengths {
            assessment.push_str(&format!("\n- {}", strength));
        }
    }

    if !evaluation.improvements.is_empty() {
        assessment.push_str("\nAreas to improve:");
        for improvement in &evaluation.improvements {
            assessment.push_str(&format!("\n- {}", improvement));
        }
    }

    for point in &evaluation.feedback_points {
        assessment.push_str(&format!(
            "\n- [{:?}] {}: {} (suggestion: {})",
            point.severity, point.category, point.message, point.suggestion
        ));
    }

    vec![
        Message::system(system_prompt(request.feedback_type)),
        Message::user(format!(
            "{}\n\nAssessment:\n{}\n\nWrite a short narrative summary (two or three paragraphs) \
             addressed to the candidate. Open with what went well, then explain the most \
             important improvements. Plain text only.",
            describe_response(request),
            assessment
        )),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::feedback::{FeedbackPoint, ResponseMetric, Severity};
    use crate::domain::MessageRole;
    use uuid::Uuid;

    fn request(feedback_type: FeedbackType) -> ValidatedFeedbackRequest {
        ValidatedFeedbackRequest {
            attempt_id: Uuid::new_v4(),
            feedback_type,
            content: "Revenue fell because volumes dropped in the north region".to_string(),
            metrics: vec![ResponseMetric::new("durationSeconds", 312.0)],
        }
    }

    #[test]
    fn test_evaluation_prompt_includes_content_and_metrics() {
        let messages = evaluation_messages(&request(FeedbackType::Drill));

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("practice drill"));
        assert!(messages[1].content.contains("north region"));
        assert!(messages[1].content.contains("durationSeconds: 312"));
        assert!(messages[1].content.contains("overallScore"));
    }

    #[test]
    fn test_type_shapes_system_prompt() {
        let messages = evaluation_messages(&request(FeedbackType::Simulation));
        assert!(messages[0].content.contains("case interview simulation"));
    }

    #[test]
    fn test_narrative_prompt_embeds_evaluation() {
        let evaluation = FeedbackEvaluation {
            overall_score: 64.4,
            strengths: vec!["Good hypothesis".to_string()],
            improvements: vec!["Size the market".to_string()],
            feedback_points: vec![FeedbackPoint::new(
                "math",
                Severity::Critical,
                "Arithmetic slip",
                "Double-check units",
            )],
        };

        let messages = narrative_messages(&request(FeedbackType::Drill), &evaluation);
        let prompt = &messages[1].content;

        assert!(prompt.contains("Overall score: 64/100"));
        assert!(prompt.contains("Good hypothesis"));
        assert!(prompt.contains("Size the market"));
        assert!(prompt.contains("[Critical] math: Arithmetic slip"));
    }
}
