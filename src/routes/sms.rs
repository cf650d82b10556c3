use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
    routing::post,
    Form, Router,
};
use serde::Deserialize;
use tracing::info;

use crate::guardrails::redact_phi;
use crate::models::records::UsageSource;
use crate::orchestration::pipeline::TurnStatus;
use crate::routes::AppStateArc;

pub const SMS_APOLOGY: &str = "Sorry, I couldn't process your message right now. Please try again later or call your clinic.";
pub const SMS_EMPTY_PROMPT: &str = "Please send your health question as a text message.";

/// Twilio-style webhook form. Only the fields we read are declared.
#[derive(Debug, Deserialize)]
pub struct SmsForm {
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "From", default)]
    pub from: String,
}

pub fn sms_routes() -> Router<AppStateArc> {
    Router::new().route("/sms", post(sms_webhook))
}

// Each SMS is its own turn; no history is kept between messages.
async fn sms_webhook(State(state): State<AppStateArc>, Form(form): Form<SmsForm>) -> impl IntoResponse {
    info!(from = %redact_phi(&form.from), "sms received");

    let reply = if form.body.trim().is_empty() {
        SMS_EMPTY_PROMPT.to_string()
    } else {
        let outcome = state.pipeline.run_turn(&form.body, &[], UsageSource::Sms).await;
        match outcome.status {
            TurnStatus::Failed => SMS_APOLOGY.to_string(),
            TurnStatus::Refused | TurnStatus::Completed => outcome.output,
        }
    };

    ([(CONTENT_TYPE, "application/xml")], twiml_message(&reply))
}

pub fn twiml_message(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        xml_escape(text)
    )
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
