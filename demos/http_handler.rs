//! Example: Storing messages in D1 with the update handler
//!
//! This example inserts a few messages into a D1 table via the HTTP REST API
//! and prints the generated row ids.
//!
//! ## Prerequisites
//!
//! 1. Create a D1 database in the Cloudflare dashboard
//! 2. Create an API token with D1 permissions
//! 3. Set the required environment variables:
//!    - `CF_ACCOUNT_ID`: Your Cloudflare account ID
//!    - `CF_DATABASE_ID`: Your D1 database ID
//!    - `CF_API_TOKEN`: Your Cloudflare API token
//!
//! ## Running
//!
//! ```bash
//! cargo run --example http_handler --features http
//! ```

use d1_update_handler::{D1HttpConfig, D1HttpConnection, Message, UpdateConfig, UpdateHandler};
use diesel_async::SimpleAsyncConnection;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = D1HttpConfig::from_env()?;
    let mut conn = D1HttpConnection::new(config);

    conn.batch_execute(
        "CREATE TABLE IF NOT EXISTS FOOS (
            ID INTEGER PRIMARY KEY AUTOINCREMENT,
            MESSAGE_ID TEXT NOT NULL,
            PAYLOAD TEXT NOT NULL
        )",
    )
    .await?;

    let insert = UpdateConfig::builder(
        "INSERT INTO FOOS (MESSAGE_ID, PAYLOAD) VALUES (:headers[id], :payload)",
    )
    .keys_generated(true)
    .key_columns(["ID"])
    .build();
    let handler = UpdateHandler::new(conn.clone(), insert);

    for payload in ["hello", "world"] {
        let keys = handler.handle_message(&Message::new(payload)).await?;
        println!("Stored {:?} as {:?}", payload, keys.first().and_then(|k| k.get("ID")));
    }

    let mut touch = UpdateHandler::new(conn, UpdateConfig::new("UPDATE FOOS SET PAYLOAD = :payload"));
    let result = touch.handle_message(&Message::new("overwritten")).await?;
    println!("Updated {:?} rows", result[0].get("UPDATED"));

    touch.reconfigure(UpdateConfig::new("DELETE FROM FOOS WHERE PAYLOAD = :payload"));
    let result = touch.handle_message(&Message::new("overwritten")).await?;
    println!("Deleted {:?} rows", result[0].get("UPDATED"));

    Ok(())
}
