use crate::error::PriceWatchError;
use log::info;
use serde::Deserialize;

pub const BINANCE_FUTURES_REST_URL: &str = "https://fapi.binance.com";

#[derive(Debug, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    #[serde(default)]
    pub contract_type: String,
    pub quote_asset: String,
}

impl SymbolInfo {
    fn is_tradable_usdt_perpetual(&self) -> bool {
        self.status == "TRADING" && self.contract_type == "PERPETUAL" && self.quote_asset == "USDT"
    }
}

/// Symbols currently trading as USDT-margined perpetuals.
pub fn perpetual_usdt_symbols(info: &ExchangeInfo) -> Vec<String> {
    info.symbols
        .iter()
        .filter(|s| s.is_tradable_usdt_perpetual())
        .map(|s| s.symbol.clone())
        .collect()
}

/// Fetch the tradable perpetual symbol list once at startup.
pub async fn fetch_perpetual_symbols(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<Vec<String>, PriceWatchError> {
    let url = format!("{}/fapi/v1/exchangeInfo", base_url.trim_end_matches('/'));
    info!("Fetching exchange info: {}", url);

    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(PriceWatchError::DiscoveryError(format!(
            "{} returned HTTP {}",
            url, status
        )));
    }

    let info: ExchangeInfo = serde_json::from_str(&response.text().await?)?;
    let symbols = perpetual_usdt_symbols(&info);
    if symbols.is_empty() {
        return Err(PriceWatchError::DiscoveryError(
            "no tradable USDT perpetual contracts listed".to_string(),
        ));
    }

    Ok(symbols)
}
