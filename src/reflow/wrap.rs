//! Greedy word wrap against an estimated character width.
//!
//! There are no glyph metrics for substitute fonts here, so every
//! character is assumed to be `font_size * char_width_factor` wide.

/// Characters that fit on one line of `width` points.
pub fn chars_per_line(width: f32, font_size: f32, char_width_factor: f32) -> usize {
    let char_width = font_size * char_width_factor;
    if char_width.is_nan() || char_width <= 0.0 || !width.is_finite() {
        return 1;
    }
    ((width / char_width).floor() as usize).max(1)
}

/// Estimated width of `text` in points.
pub fn estimated_width(text: &str, font_size: f32, char_width_factor: f32) -> f32 {
    text.chars().count() as f32 * font_size * char_width_factor
}

/// Wrap `text` into lines no wider than `width` points.
///
/// Text that already fits on one line comes back unchanged (trimmed).
/// Words are packed greedily. A word longer than twice the line budget is
/// broken with a trailing `-` at the budget boundary; shorter overlong
/// words are left to overflow on a line of their own.
pub fn wrap_text_intelligently(
    text: &str,
    width: f32,
    font_size: f32,
    char_width_factor: f32,
) -> Vec<String> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if estimated_width(text, font_size, char_width_factor) <= width {
        return vec![text.to_string()];
    }

    let budget = chars_per_line(width, font_size, char_width_factor);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: String = word.to_string();
        let mut len = word.chars().count();

        if len > budget * 2 {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let chunk = (budget - 1).max(1);
            while len > budget {
                let head: String = word.chars().take(chunk).collect();
                word = word.chars().skip(chunk).collect();
                len -= chunk;
                lines.push(format!("{head}-"));
            }
            current = word;
            current_len = len;
            continue;
        }

        if current.is_empty() {
            current = word;
            current_len = len;
        } else if current_len + 1 + len <= budget {
            current.push(' ');
            current.push_str(&word);
            current_len += 1 + len;
        } else {
            lines.push(std::mem::replace(&mut current, word));
            current_len = len;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
