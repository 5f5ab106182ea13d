//! Basic client usage example.
//!
//! Walks one branch of the CNAE hierarchy against the live IBGE service and
//! runs an accent-insensitive search.
//!
//! Run with: cargo run --example basic_usage -- padaria

use mcpbr_core::CnaeService;
use mcpbr_ibge::IbgeClient;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let client = IbgeClient::builder()
        .timeout(Duration::from_secs(15))
        .build()?;
    let service = CnaeService::new(Arc::new(client));

    println!("Seções:");
    for section in service.list_sections().await? {
        println!("  {} {}", section.code, section.description);
    }

    println!("\nDivisões da seção A:");
    for division in service.list_divisions(Some("A")).await? {
        println!("  {} {}", division.code, division.description);
    }

    let term = std::env::args().nth(1).unwrap_or_else(|| "padaria".to_string());
    println!("\nPesquisa por '{}':", term);
    let hits = service.search(&term, None).await?;
    for hit in hits.iter().take(10) {
        println!("  [{}] {} {}", hit.level, hit.entity.code, hit.entity.description);
    }
    println!("{} resultados", hits.len());

    Ok(())
}
