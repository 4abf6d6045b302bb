use crate::error::Error;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

pub type Shared = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// Directory holding the `K<fqdn>+<alg>+<tag>.{key,private}` key pairs.
    pub keystore_dir: PathBuf,
    /// DOH resolver used to look up `_dns.<domain>` SVCB records during endpoint discovery.
    #[serde(default = "default_bootstrap_doh_url")]
    pub bootstrap_doh_url: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_doh_timeout")]
    pub doh_timeout: Duration,
    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    pub api_timeout: Duration,
}

lazy_static! {
    // NOTE(XXX): Once the "ip" feature has stabilized we can use Ipv6Addr.is_unique_local[0].
    //            Presently this feature is unstable so we home-roll. See also RFC 4193[1].
    // [0]: https://doc.rust-lang.org/std/net/struct.Ipv6Addr.html#method.is_unique_local
    // [1]: https://www.rfc-editor.org/rfc/rfc4193.html
    static ref IPV6_UNIQUE_LOCAL_NETWORK: IpNetwork = IpNetwork::from_str("fc00::/7").unwrap();
}

fn default_bootstrap_doh_url() -> String {
    "https://cloudflare-dns.com/dns-query".to_string()
}

fn default_doh_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.bind_addr_is_secure()?;
        Ok(conf)
    }

    fn bind_addr_is_secure(&self) -> Result<(), Error> {
        match self.api_bind_addr {
            SocketAddr::V4(v4_addr) => {
                let ip = v4_addr.ip();
                if !ip.is_loopback() && !ip.is_private() {
                    return Err(Error::InsecureAPIBind(IpAddr::V4(*ip)));
                }
                Ok(())
            }
            SocketAddr::V6(v6_addr) => {
                let ip = v6_addr.ip();
                if !ip.is_loopback() && !IPV6_UNIQUE_LOCAL_NETWORK.contains(IpAddr::V6(*ip)) {
                    return Err(Error::InsecureAPIBind(IpAddr::V6(*ip)));
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bind: &str) -> Config {
        serde_json::from_value(serde_json::json!({
            "keystore_dir": "/var/lib/sig0crab",
            "api_bind_addr": bind,
            "api_timeout": 30,
        }))
        .unwrap()
    }

    #[test]
    fn defaults_apply() {
        let conf = config("127.0.0.1:3000");
        assert_eq!(conf.bootstrap_doh_url, default_bootstrap_doh_url());
        assert_eq!(conf.doh_timeout, Duration::from_secs(10));
        assert_eq!(conf.api_timeout, Duration::from_secs(30));
    }

    #[test]
    fn private_bind_addrs_are_accepted() {
        assert!(config("127.0.0.1:3000").bind_addr_is_secure().is_ok());
        assert!(config("10.1.2.3:3000").bind_addr_is_secure().is_ok());
        assert!(config("[::1]:3000").bind_addr_is_secure().is_ok());
        assert!(config("[fd00::1]:3000").bind_addr_is_secure().is_ok());
    }

    #[test]
    fn public_bind_addrs_are_rejected() {
        assert!(matches!(
            config("93.184.216.34:3000").bind_addr_is_secure(),
            Err(Error::InsecureAPIBind(_))
        ));
        assert!(matches!(
            config("[2606:2800:220:1::1]:3000").bind_addr_is_secure(),
            Err(Error::InsecureAPIBind(_))
        ));
    }
}
