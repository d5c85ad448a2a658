/// Persona prompt for clone replies.
///
/// The clone imitates the person it was trained on, so the system prompt is
/// built from the clone's display name and optional personality description
/// rather than a generic assistant preamble.
const PERSONA_SYSTEM: &str = "You are the AI clone of {clone_name}. You reply the way {clone_name} \
texts: same tone, message length, emoji habits, and quirks. Stay in character. Never mention that \
you are an AI model or break the persona. Keep replies conversational and short, like a chat \
message.";

const PERSONA_DESCRIPTION_SUFFIX: &str =
    "\n\nWhat is known about {clone_name}'s personality:\n{personality_description}";

pub fn build_persona_system(clone_name: &str, personality_description: Option<&str>) -> String {
    let mut system = PERSONA_SYSTEM.replace("{clone_name}", clone_name);
    if let Some(description) = personality_description.filter(|d| !d.trim().is_empty()) {
        system.push_str(
            &PERSONA_DESCRIPTION_SUFFIX
                .replace("{clone_name}", clone_name)
                .replace("{personality_description}", description.trim()),
        );
    }
    system
}
