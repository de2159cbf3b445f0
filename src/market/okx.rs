// Decoding of OKX v5 REST payloads. Transport is left to the caller.
use crate::error::MarketDataError;
use crate::market::models::{Candle, Instrument, Ticker};
use chrono::{TimeZone, Utc};
use serde::Deserialize;

/// Which candle rows survive decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandleFilter {
    /// Keep the still-forming candle as well
    All,
    /// Drop rows whose `confirm` flag is "0"
    #[default]
    ClosedOnly,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<Vec<T>, MarketDataError> {
        if self.code != "0" {
            return Err(MarketDataError::Exchange {
                code: self.code,
                msg: self.msg,
            });
        }
        Ok(self.data)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTicker {
    inst_id: String,
    #[serde(default)]
    vol_ccy24h: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstrument {
    inst_id: String,
    #[serde(default)]
    settle_ccy: String,
}

fn parse_field(row: usize, name: &str, value: &str) -> Result<f64, MarketDataError> {
    value.parse::<f64>().map_err(|_| MarketDataError::MalformedRow {
        row,
        reason: format!("{} is not a number: {:?}", name, value),
    })
}

fn parse_row(row: usize, fields: &[String]) -> Result<Candle, MarketDataError> {
    if fields.len() < 6 {
        return Err(MarketDataError::MalformedRow {
            row,
            reason: format!("expected at least 6 fields, got {}", fields.len()),
        });
    }

    let millis = fields[0]
        .parse::<i64>()
        .map_err(|_| MarketDataError::MalformedRow {
            row,
            reason: format!("timestamp is not an integer: {:?}", fields[0]),
        })?;
    let open_time = Utc
        .timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| MarketDataError::MalformedRow {
            row,
            reason: format!("timestamp out of range: {}", millis),
        })?;

    Ok(Candle::new(
        open_time,
        parse_field(row, "open", &fields[1])?,
        parse_field(row, "high", &fields[2])?,
        parse_field(row, "low", &fields[3])?,
        parse_field(row, "close", &fields[4])?,
        parse_field(row, "volume", &fields[5])?,
    ))
}

/// Decode a `/market/candles` response into candles ordered oldest to newest.
///
/// Rows are `[ts, o, h, l, c, vol, volCcy, volCcyQuote, confirm]`, all strings,
/// newest first. `row` in errors is the position in the payload.
pub fn parse_candles(json: &str, filter: CandleFilter) -> Result<Vec<Candle>, MarketDataError> {
    let envelope: Envelope<Vec<String>> = serde_json::from_str(json)?;
    let rows = envelope.into_data()?;

    let mut candles = Vec::with_capacity(rows.len());
    for (row, fields) in rows.iter().enumerate() {
        let forming = fields.get(8).map_or(false, |confirm| confirm == "0");
        if forming && filter == CandleFilter::ClosedOnly {
            continue;
        }
        candles.push(parse_row(row, fields)?);
    }

    candles.reverse();
    Ok(candles)
}

/// Decode a `/market/tickers` response.
pub fn parse_tickers(json: &str) -> Result<Vec<Ticker>, MarketDataError> {
    let envelope: Envelope<RawTicker> = serde_json::from_str(json)?;
    envelope
        .into_data()?
        .into_iter()
        .enumerate()
        .map(|(row, raw)| {
            Ok(Ticker {
                vol_ccy_24h: parse_field(row, "volCcy24h", &raw.vol_ccy24h)?,
                inst_id: raw.inst_id,
            })
        })
        .collect()
}

/// Decode a `/public/instruments` response.
pub fn parse_instruments(json: &str) -> Result<Vec<Instrument>, MarketDataError> {
    let envelope: Envelope<RawInstrument> = serde_json::from_str(json)?;
    Ok(envelope
        .into_data()?
        .into_iter()
        .map(|raw| Instrument {
            inst_id: raw.inst_id,
            settle_ccy: raw.settle_ccy,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDLES: &str = r#"{
        "code": "0",
        "msg": "",
        "data": [
            ["1700003600000", "102", "104", "101", "103.5", "12", "1200", "123000", "0"],
            ["1700001800000", "101", "103", "100", "102", "10", "1000", "101000", "1"],
            ["1700000000000", "100", "101.5", "99", "101", "8", "800", "80000", "1"]
        ]
    }"#;

    #[test]
    fn candles_are_reversed_to_oldest_first() {
        let candles = parse_candles(CANDLES, CandleFilter::All).unwrap();
        assert_eq!(candles.len(), 3);
        assert_eq!(candles[0].open_time.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(candles[2].close, 103.5);
        assert!(candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
    }

    #[test]
    fn closed_only_drops_forming_candle() {
        let candles = parse_candles(CANDLES, CandleFilter::ClosedOnly).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].close, 102.0);
    }

    #[test]
    fn exchange_error_code_is_reported() {
        let json = r#"{"code": "51001", "msg": "Instrument ID does not exist", "data": []}"#;
        match parse_candles(json, CandleFilter::All) {
            Err(MarketDataError::Exchange { code, msg }) => {
                assert_eq!(code, "51001");
                assert_eq!(msg, "Instrument ID does not exist");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_row_reports_position() {
        let json = r#"{"code": "0", "data": [
            ["1700001800000", "101", "103", "100", "102", "10"],
            ["1700000000000", "abc", "101.5", "99", "101", "8"]
        ]}"#;
        match parse_candles(json, CandleFilter::All) {
            Err(MarketDataError::MalformedRow { row, .. }) => assert_eq!(row, 1),
            other => panic!("unexpected {:?}", other),
        }

        let short = r#"{"code": "0", "data": [["1700000000000", "1", "2"]]}"#;
        assert!(parse_candles(short, CandleFilter::All).is_err());
    }

    #[test]
    fn tickers_and_instruments() {
        let tickers = parse_tickers(
            r#"{"code": "0", "data": [
                {"instId": "BTC-USDT-SWAP", "volCcy24h": "1500.5", "last": "43000"},
                {"instId": "ETH-USDT-SWAP", "volCcy24h": "9000"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(tickers[0].inst_id, "BTC-USDT-SWAP");
        assert_eq!(tickers[0].vol_ccy_24h, 1500.5);

        let instruments = parse_instruments(
            r#"{"code": "0", "data": [
                {"instId": "BTC-USDT-SWAP", "settleCcy": "USDT"},
                {"instId": "BTC-USD-SWAP", "settleCcy": "BTC"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[1].settle_ccy, "BTC");
    }
}
