use crate::gateway::error::GatewayError;
use crate::gateway::response::{AppResponse, AppResult};
use crate::util::is_hop_by_hop;

/// Structural checks on the application result, before anything is
/// transmitted. On success the triple is returned untouched; the body is not
/// consumed here.
pub fn validate(result: AppResult) -> Result<AppResponse, GatewayError> {
    let response = match result {
        AppResult::Complete(response) => response,
        AppResult::Deferred(_) => return Err(GatewayError::DeferredResponse),
    };

    let status = &response.status;
    if status.len() < 4 {
        return Err(GatewayError::StatusTooShort(lossy(status)));
    }
    let code = &status[..3];
    if !code.iter().all(u8::is_ascii_digit) || code == b"000" {
        return Err(GatewayError::StatusBadCode(lossy(status)));
    }
    if status[3] != b' ' {
        return Err(GatewayError::StatusMissingSpace(lossy(status)));
    }

    // Names are arbitrary bytes as far as this core is concerned; only the
    // hop-by-hop set is refused. Values must not break line framing.
    for (name, value) in &response.headers {
        if value.iter().any(|&b| b == b'\r' || b == b'\n') {
            return Err(GatewayError::InvalidHeaderValue(lossy(name)));
        }
        if is_hop_by_hop(name) {
            return Err(GatewayError::HopByHopHeader(lossy(name)));
        }
    }

    Ok(response)
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn triple(status: &'static [u8]) -> AppResult {
        AppResult::Complete(AppResponse::new(Bytes::from_static(status), vec![], vec![]))
    }

    #[test]
    fn accepts_minimal_status() {
        assert!(validate(triple(b"200 ")).is_ok());
    }

    #[test]
    fn rejects_zero_code() {
        assert!(matches!(
            validate(triple(b"000 huh")),
            Err(GatewayError::StatusBadCode(_))
        ));
    }
}
