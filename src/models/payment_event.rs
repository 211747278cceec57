use serde_json::Value;

/// Checkout amounts that identify the pro purchase when the payload
/// carries no usable plan name.
pub const KNOWN_PRICE_POINTS: [&str; 3] = ["1500", "15", "15.00"];

pub const PRO_PLAN_CREDITS: i64 = 10;
pub const FREE_PLAN_CREDITS: i64 = 1;

/// Payment/subscription lifecycle tags this service acts on. Everything
/// else is acknowledged as `Unhandled` rather than falling through
/// silently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventKind {
    PaymentCompleted,
    CheckoutCompleted,
    SubscriptionActivated,
    SubscriptionRenewed,
    Unhandled(String),
}

impl PaymentEventKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "payment.completed" => PaymentEventKind::PaymentCompleted,
            "checkout.completed" => PaymentEventKind::CheckoutCompleted,
            "subscription.activated" => PaymentEventKind::SubscriptionActivated,
            "subscription.renewed" => PaymentEventKind::SubscriptionRenewed,
            other => PaymentEventKind::Unhandled(other.to_string()),
        }
    }

    pub fn grants_credits(&self) -> bool {
        !matches!(self, PaymentEventKind::Unhandled(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentEventKind::PaymentCompleted => "payment.completed",
            PaymentEventKind::CheckoutCompleted => "checkout.completed",
            PaymentEventKind::SubscriptionActivated => "subscription.activated",
            PaymentEventKind::SubscriptionRenewed => "subscription.renewed",
            PaymentEventKind::Unhandled(tag) => tag,
        }
    }
}

/// One provider delivery, parsed tolerantly from the loosely structured
/// webhook payload. Identity is `id` (falling back to `event_id`); an
/// empty id means dedup is skipped for this event.
#[derive(Debug, Clone)]
pub struct PaymentEvent {
    pub id: String,
    pub kind: PaymentEventKind,
    pub data: Value,
}

// Small helper: nested json lookup
fn jget<'a>(val: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = val;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

fn extract_str<'a>(val: &'a Value, path: &[&str]) -> Option<&'a str> {
    jget(val, path)?.as_str()
}

impl PaymentEvent {
    pub fn from_payload(payload: &Value) -> Self {
        let id = extract_str(payload, &["id"])
            .or_else(|| extract_str(payload, &["event_id"]))
            .unwrap_or("")
            .to_string();
        let tag = extract_str(payload, &["type"])
            .or_else(|| extract_str(payload, &["event"]))
            .unwrap_or("");
        let data = payload.get("data").cloned().unwrap_or(Value::Null);

        PaymentEvent {
            id,
            kind: PaymentEventKind::from_tag(tag),
            data,
        }
    }

    pub fn customer_email(&self) -> Option<String> {
        let email = extract_str(&self.data, &["customer", "email"])
            .or_else(|| extract_str(&self.data, &["email"]))
            .unwrap_or("")
            .trim()
            .to_string();
        if email.is_empty() {
            None
        } else {
            Some(email)
        }
    }

    /// Plan name, from the first populated of `plan`, `product.name`,
    /// `price.name`, `line_item.name`.
    pub fn plan_name(&self) -> String {
        extract_str(&self.data, &["plan"])
            .or_else(|| extract_str(&self.data, &["product", "name"]))
            .or_else(|| extract_str(&self.data, &["price", "name"]))
            .or_else(|| extract_str(&self.data, &["line_item", "name"]))
            .unwrap_or("")
            .to_string()
    }

    pub fn amount(&self) -> Option<String> {
        jget(&self.data, &["amount"])
            .or_else(|| jget(&self.data, &["price", "amount"]))
            .and_then(stringify_amount)
    }

    pub fn resolve_credits(&self) -> i64 {
        credits_for_plan(&self.plan_name(), self.amount().as_deref())
    }
}

// Providers send amounts as both strings and numbers; fold them into one
// textual form so the price-point match is shape-independent.
fn stringify_amount(val: &Value) -> Option<String> {
    match val {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| {
                    if f.fract() == 0.0 {
                        format!("{}", f as i64)
                    } else {
                        f.to_string()
                    }
                })
            }
        }
        _ => None,
    }
}

/// The grant policy. Case-insensitive substring on the plan name, then
/// the known price points as a fallback; anything unresolvable is a
/// legitimate zero-credit outcome, not an error.
pub fn credits_for_plan(name: &str, amount: Option<&str>) -> i64 {
    let n = name.to_lowercase();
    if n.contains("pro") {
        return PRO_PLAN_CREDITS;
    }
    if n.contains("free") {
        return FREE_PLAN_CREDITS;
    }
    if let Some(amount) = amount {
        if KNOWN_PRICE_POINTS.contains(&amount) {
            return PRO_PLAN_CREDITS;
        }
    }
    0
}
