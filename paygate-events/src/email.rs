//! HTML bodies for the notification envelopes. The rendering here is the
//! whole template engine this side of the contract: subject + simple markup.

fn layout(title: &str, body: &str) -> String {
    format!(
        "<html><body><h2>{title}</h2>{body}\
         <p>If you did not expect this operation, contact support.</p></body></html>"
    )
}

pub fn withdraw_created(card_number: &str, amount: i64) -> (String, String) {
    let subject = "Withdraw processed".to_string();
    let body = format!(
        "<p>A withdraw of <b>{amount}</b> was processed on card <b>{card_number}</b>.</p>"
    );
    (subject, layout("Withdraw processed", &body))
}

pub fn withdraw_updated(card_number: &str, amount: i64) -> (String, String) {
    let subject = "Withdraw updated".to_string();
    let body = format!(
        "<p>A withdraw on card <b>{card_number}</b> was updated to <b>{amount}</b>.</p>"
    );
    (subject, layout("Withdraw updated", &body))
}

pub fn topup_created(card_number: &str, amount: i64, method: &str) -> (String, String) {
    let subject = "Top-up received".to_string();
    let body = format!(
        "<p>Your card <b>{card_number}</b> was topped up with <b>{amount}</b> via {method}.</p>"
    );
    (subject, layout("Top-up received", &body))
}

pub fn topup_updated(card_number: &str, amount: i64) -> (String, String) {
    let subject = "Top-up updated".to_string();
    let body = format!(
        "<p>A top-up on card <b>{card_number}</b> was updated to <b>{amount}</b>.</p>"
    );
    (subject, layout("Top-up updated", &body))
}

pub fn transaction_created(card_number: &str, amount: i64, merchant_id: u64) -> (String, String) {
    let subject = "Payment completed".to_string();
    let body = format!(
        "<p>A payment of <b>{amount}</b> to merchant <b>{merchant_id}</b> \
         was completed from card <b>{card_number}</b>.</p>"
    );
    (subject, layout("Payment completed", &body))
}

pub fn transaction_updated(card_number: &str, amount: i64) -> (String, String) {
    let subject = "Payment updated".to_string();
    let body = format!(
        "<p>A payment from card <b>{card_number}</b> was updated to <b>{amount}</b>.</p>"
    );
    (subject, layout("Payment updated", &body))
}

pub fn transfer_created(from: &str, to: &str, amount: i64) -> (String, String) {
    let subject = "Transfer sent".to_string();
    let body = format!(
        "<p>A transfer of <b>{amount}</b> from card <b>{from}</b> to card <b>{to}</b> \
         was completed.</p>"
    );
    (subject, layout("Transfer sent", &body))
}

pub fn transfer_updated(from: &str, to: &str, amount: i64) -> (String, String) {
    let subject = "Transfer updated".to_string();
    let body = format!(
        "<p>The transfer from card <b>{from}</b> to card <b>{to}</b> was updated \
         to <b>{amount}</b>.</p>"
    );
    (subject, layout("Transfer updated", &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bodies_carry_the_operation_fields() {
        let (subject, html) = withdraw_created("4000000000000001", 300);
        assert_eq!(subject, "Withdraw processed");
        assert!(html.contains("4000000000000001"));
        assert!(html.contains("300"));
        assert!(html.starts_with("<html>"));
    }
}
