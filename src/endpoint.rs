//! DOH endpoint discovery.
//!
//! A domain advertises its DNS-over-HTTPS service with `SVCB` records at `_dns.<domain>`, see
//! [RFC-9461][RFC-9461] and [RFC-9462][RFC-9462]:
//!
//! ```text
//! _dns.example.com. IN SVCB 1 doh.example.com. alpn=h2 dohpath=/dns-query{?dns}
//! ```
//!
//! The records are looked up through the configured bootstrap DOH resolver and the first one
//! that yields a usable URL wins. Answers are taken in the order the resolver returned them;
//! `SvcPriority` isn't used to reorder them. AliasMode records (priority `0`) are skipped.
//!
//! [RFC-9461]: https://www.rfc-editor.org/rfc/rfc9461
//! [RFC-9462]: https://www.rfc-editor.org/rfc/rfc9462

use crate::dns::message::{self, fqdn, DDR_PREFIX};
use crate::dns::transport::DohTransport;
use crate::error::Error;
use reqwest::Url;
use std::str::FromStr;
use trust_dns_client::op::ResponseCode;
use trust_dns_client::rr::rdata::svcb::{SvcParamValue, SVCB};
use trust_dns_client::rr::{Name, RData};

const SVC_PARAM_DOHPATH: u16 = 7;
const DEFAULT_DOH_PATH: &str = "/dns-query";

/// Resolve the DOH endpoint URL advertised by `domain`, asking the resolver at `bootstrap`.
///
/// # Errors
///
/// Returns [`Error::Resolution`] if the lookup fails, `domain` has no `SVCB` records, or none
/// of them describe a usable URL.
pub async fn find_doh_endpoint(
    transport: &(dyn DohTransport + Send + Sync),
    bootstrap: &str,
    domain: &str,
) -> Result<String, Error> {
    let domain_name = fqdn(domain).map_err(|err| Error::resolution(domain, err))?;
    let svcb_name = Name::from_str(DDR_PREFIX)
        .and_then(|prefix| prefix.append_domain(&domain_name))
        .map_err(|err| Error::resolution(domain, err))?;

    let response = transport
        .send(bootstrap, message::svcb_query(svcb_name.clone()))
        .await
        .map_err(|err| Error::resolution(domain, err))?;
    match response.response_code() {
        ResponseCode::NoError => {}
        ResponseCode::NXDomain => {
            return Err(Error::resolution(domain, format!("{svcb_name} does not exist")))
        }
        code => return Err(Error::resolution(domain, format!("lookup answered {code}"))),
    }

    let url = response
        .answers()
        .iter()
        .filter_map(|rr| match rr.data() {
            Some(RData::SVCB(svcb)) => Some(ServiceBinding::from(svcb)),
            _ => None,
        })
        .find_map(|candidate| candidate.url(&domain_name))
        .ok_or_else(|| Error::resolution(domain, format!("no usable SVCB record at {svcb_name}")))?;

    tracing::info!("resolved DOH endpoint for \"{domain_name}\": {url}");
    Ok(url.to_string())
}

/// The parts of an `SVCB` record that locate a DOH service.
#[derive(Debug, PartialEq, Eq)]
struct ServiceBinding {
    priority: u16,
    /// The root name stands for the owner's domain.
    target: Name,
    port: Option<u16>,
    dohpath: Option<String>,
}

impl From<&SVCB> for ServiceBinding {
    fn from(svcb: &SVCB) -> Self {
        let mut binding = ServiceBinding {
            priority: svcb.svc_priority(),
            target: svcb.target_name().clone(),
            port: None,
            dohpath: None,
        };
        for (key, value) in svcb.svc_params() {
            match value {
                SvcParamValue::Port(port) => binding.port = Some(*port),
                SvcParamValue::Unknown(unknown) if u16::from(*key) == SVC_PARAM_DOHPATH => {
                    binding.dohpath = String::from_utf8(unknown.0.clone()).ok();
                }
                _ => {}
            }
        }
        binding
    }
}

impl ServiceBinding {
    fn url(&self, domain: &Name) -> Option<Url> {
        if self.priority == 0 {
            return None;
        }
        let target = if self.target.is_root() {
            domain
        } else {
            &self.target
        };
        let host = target.to_ascii().trim_end_matches('.').to_string();
        let port = self.port.map(|port| format!(":{port}")).unwrap_or_default();
        let path = match &self.dohpath {
            Some(template) => template.split('{').next().unwrap_or_default().to_string(),
            None => DEFAULT_DOH_PATH.to_string(),
        };
        if !path.starts_with('/') {
            return None;
        }
        Url::parse(&format!("https://{host}{port}{path}")).ok()
    }
}
