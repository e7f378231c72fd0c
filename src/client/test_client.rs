use anyhow::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Load configuration
    dotenvy::dotenv().ok();

    let base_url =
        std::env::var("PESA_PUSH_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    let phone = std::env::var("TEST_PHONE").unwrap_or_else(|_| "254712345678".to_string());
    let amount: f64 = std::env::var("TEST_AMOUNT")
        .unwrap_or_else(|_| "10".to_string())
        .parse()?;
    let app_name =
        std::env::var("TEST_APP_NAME").unwrap_or_else(|_| "Telegram Premium".to_string());

    println!("pesa-push Test Client");
    println!("=====================");
    println!("Server: {}", base_url);
    println!("Phone:  {}", phone);
    println!("Amount: {} KES", amount);
    println!();

    let client = Client::new();

    println!("Step 1: Initiating STK push...");
    let response = client
        .post(format!("{}/payments/initiate", base_url))
        .json(&json!({
            "phone": phone,
            "amount": amount,
            "appName": app_name,
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let error_text = response.text().await?;
        anyhow::bail!("Initiation failed: {}", error_text);
    }

    let initiated: Value = response.json().await?;
    let checkout_request_id = initiated
        .get("checkoutRequestId")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| anyhow::anyhow!("no checkoutRequestId in response"))?;

    println!(
        "   [OK] Push sent, checkoutRequestId: {}",
        checkout_request_id
    );
    println!(
        "   Reference: {}",
        initiated
            .get("reference")
            .and_then(Value::as_str)
            .unwrap_or("-")
    );
    println!("   Check your phone and enter the M-Pesa PIN.");
    println!();

    println!("Step 2: Polling payment status every 3s (up to 120s)...");
    let deadline = Instant::now() + Duration::from_secs(120);

    loop {
        tokio::time::sleep(Duration::from_secs(3)).await;

        let status: Value = client
            .post(format!("{}/payments/status", base_url))
            .json(&json!({ "checkoutRequestId": checkout_request_id }))
            .send()
            .await?
            .json()
            .await?;

        let verdict = status
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("pending");
        let message = status.get("message").and_then(Value::as_str).unwrap_or("");
        println!("   status={} {}", verdict, message);

        match verdict {
            "success" => {
                println!();
                println!("[SUCCESS] Payment settled");
                if let Some(code) = status.get("transactionCode").and_then(Value::as_str) {
                    println!("   M-Pesa receipt: {}", code);
                }
                break;
            }
            "failed" => {
                println!();
                println!("[FAILED] {}", message);
                break;
            }
            _ => {
                if Instant::now() >= deadline {
                    println!();
                    println!(
                        "[TIMEOUT] No terminal status within 120s; the push may still settle"
                    );
                    break;
                }
            }
        }
    }

    Ok(())
}
