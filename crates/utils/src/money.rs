/// Render centavos as `12,500.00`. Negative amounts keep a leading `-`.
pub fn format_centavos(amount: i64) -> String {
    let negative = amount < 0;
    let abs = amount.unsigned_abs();
    let whole = (abs / 100).to_string();
    let cents = abs % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, cents)
}
