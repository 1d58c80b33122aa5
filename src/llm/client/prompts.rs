//! Default instruction prompt for narrative segmentation.

/// Instructions sent with every story. The story itself is the request input.
pub const DEFAULT_SEGMENTATION_PROMPT: &str = r#"Return the given story segmented into beginning, rising action, climax, and falling action in JSON format. Return the first sentence of the section followed by ... and then the last sentence of the section. Example: ```json
{
  "beginning": "“Oh, there IS one, of course, but you’ll never know it.”... Life’s too short for a ghost who can only be enjoyed in retrospect.",
  "rising_action": "But to the Boynes it was one of the ever-recurring wonders... she rose from her seat and stood among the shadows of the hearth.",
  "climax": "You knew about this, then--it’s all right?... I give you my word it never was righter!” he laughed back at her, holding her close.",
  "falling_action": "One of the strangest things she was afterward to recall... give it up, if that’s the best you can do.”"
}
```"#;
