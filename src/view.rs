//! HTML rendering for the prediction form and its result panels.

use crate::models::{
    BankAccountLabel, CategoricalField, FormControl, NumericField, PredictionOutcome,
    RespondentRecord, FORM_LAYOUT,
};

pub const PAGE_TITLE: &str = "📊 Financial Inclusion Predictor";
pub const FORM_HEADER: &str = "📝 Enter Respondent Information";
pub const RESULT_HEADER: &str = "🔍 Prediction Result";

const STYLE: &str = r#"
        body { font-family: sans-serif; max-width: 720px; margin: 2rem auto; padding: 0 1rem; }
        label { display: block; margin-top: 0.75rem; font-weight: 600; }
        select, input[type=number] { width: 100%; padding: 0.4rem; margin-top: 0.25rem; }
        button { margin-top: 1.25rem; padding: 0.5rem 1.5rem; }
        .panel { margin-top: 1rem; padding: 0.75rem 1rem; border-radius: 0.4rem; }
        .panel.success { background: #e6f4ea; color: #1e6b34; }
        .panel.error { background: #fdecea; color: #8a1c1c; }
"#;

/// Renders the full page: the form, and the result section when a
/// submission has been dispatched.
///
/// `values` decides which option each control shows as selected.
pub fn render_page(values: &RespondentRecord, outcome: Option<&PredictionOutcome>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str(&format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>{style}</style>
</head>
<body>
    <h1>{title}</h1>
    <h2>{header}</h2>
"#,
        title = escape_html(PAGE_TITLE),
        style = STYLE,
        header = escape_html(FORM_HEADER),
    ));

    html.push_str(&render_form(values));

    if let Some(outcome) = outcome {
        html.push_str(&render_outcome(outcome));
    }

    html.push_str("</body>\n</html>\n");
    html
}

/// The form with all ten controls and the submit button.
pub fn render_form(values: &RespondentRecord) -> String {
    let mut html = String::from("    <form id=\"predict_form\" method=\"post\" action=\"/predict\">\n");
    for control in FORM_LAYOUT {
        let rendered = match control {
            FormControl::Select(field) => {
                let selected = values
                    .categorical_value(field.name)
                    .unwrap_or_else(|| field.default_choice());
                render_selector(&field, selected)
            }
            FormControl::Number(field) => {
                let value = values.numeric_value(field.name).unwrap_or(field.default);
                render_number_input(&field, value)
            }
        };
        html.push_str(&rendered);
    }
    html.push_str("        <button type=\"submit\">Predict</button>\n    </form>\n");
    html
}

/// A single-choice selector over the field's enumeration.
///
/// If `selected` is not one of the choices the first choice is selected.
pub fn render_selector(field: &CategoricalField, selected: &str) -> String {
    let selected = if field.contains(selected) {
        selected
    } else {
        field.default_choice()
    };

    let mut html = format!(
        "        <label for=\"{name}\">{label}</label>\n        <select id=\"{name}\" name=\"{name}\">\n",
        name = field.name,
        label = escape_html(field.label),
    );
    for choice in field.choices {
        let marker = if *choice == selected { " selected" } else { "" };
        html.push_str(&format!(
            "            <option value=\"{value}\"{marker}>{text}</option>\n",
            value = escape_html(choice),
            marker = marker,
            text = escape_html(choice),
        ));
    }
    html.push_str("        </select>\n");
    html
}

/// A bounded integer input. The displayed value is clamped to the bounds.
pub fn render_number_input(field: &NumericField, value: i64) -> String {
    format!(
        "        <label for=\"{name}\">{label}</label>\n        <input type=\"number\" id=\"{name}\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"1\" value=\"{value}\" required>\n",
        name = field.name,
        label = escape_html(field.label),
        min = field.min,
        max = field.max,
        value = field.clamp(value),
    )
}

/// The result section for a dispatched submission.
pub fn render_outcome(outcome: &PredictionOutcome) -> String {
    let (class, text) = match outcome {
        PredictionOutcome::Succeeded(prediction) => match prediction.label {
            BankAccountLabel::Likely => {
                ("success", format!("✅ {}", prediction.summary()))
            }
            BankAccountLabel::Unlikely => {
                ("error", format!("❌ {}", prediction.summary()))
            }
        },
        PredictionOutcome::Failed { reason } => {
            ("error", format!("⚠️ Prediction failed: {}", reason))
        }
    };

    format!(
        "    <section id=\"result\">\n        <h3>{header}</h3>\n        <div class=\"panel {class}\" role=\"status\">{text}</div>\n    </section>\n",
        header = escape_html(RESULT_HEADER),
        class = class,
        text = escape_html(&text),
    )
}

/// Escapes text for use in HTML element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
