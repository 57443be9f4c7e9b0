//! Classification prompt.
//!
//! A prompt template may contain the placeholder [`SECOND_PLACEHOLDER`];
//! [`build_prompt`] replaces every occurrence with the frame's second. A
//! template without the placeholder gets a trailing note naming the second
//! instead, so the model always knows which second it is looking at.

/// Placeholder substituted with the frame's second.
pub const SECOND_PLACEHOLDER: &str = "<integer>";

/// Default activity-classification prompt.
pub const DEFAULT_PROMPT: &str = r#"Analyze this image and return a JSON object with the following structure:

{
  "second": <integer>,
  "overall_action": "<one of: sport, sleep, food, work, leisure>",
  "sub_action": "<string>",
  "description": "<string>"
}

Rules:
- overall_action must be exactly one of: sport, sleep, food, work, leisure
- sub_action refines the overall action:
  * For "sport": the sport type (e.g. "running", "basketball", "swimming", "cycling")
  * For "sleep": empty string ""
  * For "food": empty string ""
  * For "work": "standing" or "sitting"
  * For "leisure": the activity (e.g. "tv", "phone", "reading", "gaming", "socializing")
- description is REQUIRED. Be as specific as possible:
  * What is the person doing? Describe their actions in detail.
  * If eating, what exactly are they eating? Be specific about the food, quantity, size and type, focusing on items in the foreground.
  * Describe the scene, the environment and any notable details.
  * Never leave description empty.

Return ONLY valid JSON, no additional text or explanation."#;

/// Build the prompt for the frame at `second`.
///
/// # Example
///
/// ```
/// use secondsight::build_prompt;
///
/// assert_eq!(build_prompt("second=<integer>", 7), "second=7");
/// assert!(build_prompt("describe", 7).ends_with(
///     "Include this second number in your JSON response."
/// ));
/// ```
pub fn build_prompt(template: &str, second: u64) -> String {
    if template.contains(SECOND_PLACEHOLDER) {
        template.replace(SECOND_PLACEHOLDER, &second.to_string())
    } else {
        format!(
            "{template}\n\nNote: This frame is from second {second} of the video. \
             Include this second number in your JSON response."
        )
    }
}
