//! Card form validation and input formatting.
//!
//! Messages are the Portuguese strings shown next to each field.

use crate::payments::types::{Customer, CustomerIdentification, IdentificationType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const ORDER_SUBJECT: &str = "Pagamento via cartão de crédito";
pub const ORDER_CONTENT: &str = "Pagamento processado via Pagsmile";
const EXPIRY_YEAR_SPAN: i32 = 15;
const MIN_AMOUNT_CENTS: u64 = 100;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

const ELO_PREFIXES: [&str; 22] = [
    "4011", "4312", "4389", "4514", "4573", "4576", "5041", "5066", "5067", "509", "6277", "6362",
    "6363", "650", "651", "652", "653", "654", "655", "656", "657", "658",
];

pub fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// CPF with both mod-11 check digits. Repeated-digit numbers are rejected.
pub fn validate_cpf(cpf: &str) -> bool {
    let numbers: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if numbers.len() != 11 {
        return false;
    }
    if numbers.iter().all(|&d| d == numbers[0]) {
        return false;
    }

    let check_digit = |len: usize| -> u32 {
        let sum: u32 = numbers[..len]
            .iter()
            .enumerate()
            .map(|(i, &d)| d * (len as u32 + 1 - i as u32))
            .sum();
        let remainder = (sum * 10) % 11;
        if remainder == 10 {
            0
        } else {
            remainder
        }
    };

    check_digit(9) == numbers[9] && check_digit(10) == numbers[10]
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn validate_card_number(card_number: &str) -> bool {
    (13..=19).contains(&digits(card_number).len())
}

pub fn validate_card_name(name: &str) -> bool {
    name.trim().chars().count() >= 3
}

pub fn validate_cvv(cvv: &str) -> bool {
    (3..=4).contains(&digits(cvv).len())
}

pub fn validate_phone(phone: &str) -> bool {
    (10..=11).contains(&digits(phone).len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Elo,
    Hipercard,
}

/// Brand by BIN prefix, first match wins in the order Visa, Mastercard, Amex,
/// Elo, Hipercard. Elo BINs starting with 4 therefore read as Visa.
pub fn detect_card_brand(card_number: &str) -> Option<CardBrand> {
    let numbers = digits(card_number);
    if numbers.is_empty() {
        return None;
    }
    if numbers.starts_with('4') {
        return Some(CardBrand::Visa);
    }
    let head = numbers.get(..2).unwrap_or_default();
    if matches!(head, "51" | "52" | "53" | "54" | "55") {
        return Some(CardBrand::Mastercard);
    }
    if matches!(head, "34" | "37") {
        return Some(CardBrand::Amex);
    }
    if ELO_PREFIXES.iter().any(|p| numbers.starts_with(p)) {
        return Some(CardBrand::Elo);
    }
    if matches!(head, "38" | "60") {
        return Some(CardBrand::Hipercard);
    }
    None
}

pub fn format_card_number(value: &str) -> String {
    let numbers = digits(value);
    numbers
        .as_bytes()
        .chunks(4)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// `52998224725` -> `529.982.247-25`, tolerating partial input.
pub fn format_cpf(value: &str) -> String {
    let n = digits(value);
    let len = n.len();
    match len {
        0..=3 => n,
        4..=6 => format!("{}.{}", &n[..3], &n[3..]),
        7..=9 => format!("{}.{}.{}", &n[..3], &n[3..6], &n[6..]),
        _ => format!(
            "{}.{}.{}-{}",
            &n[..3],
            &n[3..6],
            &n[6..9],
            &n[9..len.min(11)]
        ),
    }
}

/// `11987654321` -> `(11) 98765-4321`, tolerating partial input.
pub fn format_phone(value: &str) -> String {
    let n = digits(value);
    let len = n.len();
    match len {
        0 => String::new(),
        1..=2 => format!("({}", n),
        3..=7 => format!("({}) {}", &n[..2], &n[2..]),
        _ => format!("({}) {}-{}", &n[..2], &n[2..7], &n[7..len.min(11)]),
    }
}

fn cents_from_digits(value: &str) -> Option<u64> {
    let numbers = digits(value);
    if numbers.is_empty() {
        return None;
    }
    numbers.parse::<u64>().ok()
}

/// pt-BR grouping: `123456` cents -> `1.234,56`.
pub fn format_cents_pt_br(cents: u64) -> String {
    let units = (cents / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, c) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{},{:02}", grouped, cents % 100)
}

/// Amount typed as cents and shown in pt-BR form.
pub fn format_amount(value: &str) -> String {
    cents_from_digits(value)
        .map(format_cents_pt_br)
        .unwrap_or_default()
}

/// Display amount back to the gateway's decimal form: `1.234,56` -> `1234.56`.
pub fn parse_amount(formatted: &str) -> String {
    let cents = cents_from_digits(formatted).unwrap_or(0);
    format!("{}.{:02}", cents / 100, cents % 100)
}

pub fn format_brl(cents: u64) -> String {
    format!("R$ {}", format_cents_pt_br(cents))
}

/// Pay button label, e.g. `3x de R$ 33,33`. Empty for a zero amount.
pub fn installment_label(formatted_amount: &str, installments: u32) -> String {
    let cents = cents_from_digits(formatted_amount).unwrap_or(0);
    if cents == 0 {
        return String::new();
    }
    if installments > 1 {
        let n = u64::from(installments);
        let rem = cents % n;
        let per_installment = cents / n + u64::from(rem * 2 >= n);
        format!("{}x de {}", installments, format_brl(per_installment))
    } else {
        format_brl(cents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearOption {
    /// Two-digit value submitted with the form
    pub value: String,
    pub label: String,
}

pub fn expiry_year_options(current_year: i32) -> Vec<YearOption> {
    (0..EXPIRY_YEAR_SPAN)
        .map(|offset| {
            let year = (current_year + offset).to_string();
            YearOption {
                value: year[year.len().saturating_sub(2)..].to_string(),
                label: year,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    CardNumber,
    CardName,
    Cvv,
    Cpf,
    Email,
    Phone,
    Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    pub errors: Vec<FieldError>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn message_for(&self, field: FormField) -> Option<&'static str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message)
    }

    fn push(&mut self, field: FormField, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }
}

impl std::fmt::Display for FormErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.errors.iter().map(|e| e.message).collect();
        write!(f, "{}", messages.join(", "))
    }
}

/// Raw values as typed into the checkout form. Card fields are read by the
/// tokenization SDK; they are validated here but never sent to the backend.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm {
    pub card_number: String,
    pub card_name: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvv: String,
    pub cpf: String,
    pub email: String,
    pub phone: String,
    /// Formatted pt-BR amount, e.g. `100,00`
    pub amount: String,
    pub installments: String,
}

/// Order fields derived from a valid form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderData {
    pub order_amount: String,
    pub subject: String,
    pub content: String,
    pub buyer_id: String,
    pub customer: Customer,
    pub installments: u32,
}

impl CheckoutForm {
    /// Collects every field error; the form is valid when none are returned.
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if !validate_card_number(&self.card_number) {
            errors.push(FormField::CardNumber, "Número do cartão inválido");
        }
        if !validate_card_name(&self.card_name) {
            errors.push(FormField::CardName, "Nome inválido");
        }
        if !validate_cvv(&self.cvv) {
            errors.push(FormField::Cvv, "CVV inválido");
        }
        if !validate_cpf(&self.cpf) {
            errors.push(FormField::Cpf, "CPF inválido");
        }
        if !validate_email(&self.email) {
            errors.push(FormField::Email, "E-mail inválido");
        }
        if !validate_phone(&self.phone) {
            errors.push(FormField::Phone, "Telefone inválido");
        }
        if cents_from_digits(&self.amount).unwrap_or(0) < MIN_AMOUNT_CENTS {
            errors.push(FormField::Amount, "Valor inválido");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn installments(&self) -> u32 {
        self.installments
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n >= 1)
            .unwrap_or(1)
    }

    pub fn card_brand(&self) -> Option<CardBrand> {
        detect_card_brand(&self.card_number)
    }

    /// `now_millis` seeds the buyer id.
    pub fn order_data(&self, now_millis: i64) -> OrderData {
        OrderData {
            order_amount: parse_amount(&self.amount),
            subject: ORDER_SUBJECT.to_string(),
            content: ORDER_CONTENT.to_string(),
            buyer_id: format!("buyer_{}", now_millis),
            customer: Customer {
                name: Some(self.card_name.clone()),
                email: Some(self.email.clone()),
                phone: Some(digits(&self.phone)),
                identify: Some(CustomerIdentification {
                    kind: IdentificationType::Cpf,
                    number: digits(&self.cpf),
                }),
            },
            installments: self.installments(),
        }
    }
}
