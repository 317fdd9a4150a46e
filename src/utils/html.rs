// src/utils/html.rs

/// Clean user-supplied HTML with the ammonia whitelist.
///
/// Safe formatting tags (<b>, <p>, ...) survive; <script>, <iframe> and
/// event-handler attributes are stripped. Post bodies pass through here
/// before they are stored.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
