//! Drive the authorization code flow against a real authorization server.
//!
//! ```sh
//! cargo run --example login --features "reqwest-client browser-open" -- \
//!     <client-id> <authorization-endpoint> <token-endpoint> [scope ...]
//! ```

use std::env;

use url::Url;

fn main() -> miette::Result<()> {
    let mut args = env::args().skip(1);
    let (Some(client_id), Some(auth_endpoint), Some(token_endpoint)) =
        (args.next(), args.next(), args.next())
    else {
        eprintln!("usage: login <client-id> <authorization-endpoint> <token-endpoint> [scope ...]");
        std::process::exit(2);
    };
    let scopes: Vec<String> = args.collect();
    let scopes: Vec<&str> = scopes.iter().map(String::as_str).collect();

    let auth_endpoint = Url::parse(&auth_endpoint)
        .map_err(|e| miette::miette!("invalid authorization endpoint: {e}"))?;
    let token_endpoint =
        Url::parse(&token_endpoint).map_err(|e| miette::miette!("invalid token endpoint: {e}"))?;

    let client = treadle::client(client_id).with_token_endpoint(token_endpoint)?;
    let grant = client.authorization_code_grant(auth_endpoint);

    println!("opening the system browser, waiting for the loopback redirect ...");
    let response = grant.authorize(
        &reqwest::blocking::Client::new(),
        treadle::open_system_browser,
        &scopes,
    )?;

    println!("token endpoint answered {}", response.status());
    println!("{}", String::from_utf8_lossy(response.body()));
    Ok(())
}
