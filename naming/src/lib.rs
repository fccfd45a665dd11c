#![forbid(unsafe_code)]

mod template;

pub use template::{Template, TemplateError, TemplatePart, render_template};

/// Split an identifier into words on separators and case boundaries.
///
/// `orderCreated`, `order-created` and `ORDER_CREATED` all split into two words. A run of
/// capitals is kept together as an acronym (`DLQConsumer` splits into `DLQ`, `Consumer`).
pub fn split_words(input: &str) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (idx, &ch) in chars.iter().enumerate() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if ch.is_uppercase() && !current.is_empty() {
            let prev = chars[idx - 1];
            let next_is_lower = chars.get(idx + 1).is_some_and(|next| next.is_lowercase());
            if prev.is_lowercase() || prev.is_numeric() || (prev.is_uppercase() && next_is_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(ch);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

pub fn upper_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn lower_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn capitalize(word: &str) -> String {
    upper_first(&word.to_lowercase())
}

pub fn kebab_case(input: &str) -> String {
    join_lower(input, "-")
}

pub fn snake_case(input: &str) -> String {
    join_lower(input, "_")
}

pub fn upper_snake_case(input: &str) -> String {
    split_words(input)
        .iter()
        .map(|word| word.to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn camel_case(input: &str) -> String {
    split_words(input)
        .iter()
        .enumerate()
        .map(|(idx, word)| {
            if idx == 0 {
                word.to_lowercase()
            } else {
                capitalize(word)
            }
        })
        .collect()
}

pub fn pascal_case(input: &str) -> String {
    split_words(input).iter().map(|word| capitalize(word)).collect()
}

/// Title form used for CloudFormation logical ids built from a user supplied name.
///
/// Only the first character changes, so `orderCreated` becomes `OrderCreated` and `DLQ` stays
/// `DLQ`.
pub fn title_case(input: &str) -> String {
    upper_first(input)
}

/// The logical id prefix the deployment framework derives for a function.
///
/// `get-user_v2` becomes `GetDashuserUnderscorev2`, matching the ids the framework assigns to
/// `<prefix>LambdaFunction` and `<prefix>LambdaFunctionUrl`.
pub fn function_logical_id(function_name: &str) -> String {
    upper_first(
        &function_name
            .replace('-', "Dash")
            .replace('_', "Underscore"),
    )
}

fn join_lower(input: &str, separator: &str) -> String {
    split_words(input)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}
