//! Encoding of a host's attributes into a single Valkey string value.
//!
//! Format: `name=<name>;address=<address>;`, where `address` is omitted when unset.
//! Values without any `=` are from older versions that stored only the bare name.
//! Separators inside values are not escaped.

use tracing::warn;

use crate::storage::Host;

const KEY_NAME: &str = "name";
const KEY_ADDRESS: &str = "address";

pub(super) fn serialize_host(host: &Host) -> String {
    let fields = [Some(host.name.as_str()), host.address.as_deref()];
    if fields.into_iter().flatten().any(|field| field.contains(';')) {
        warn!(
            mac = %host.mac,
            name = %host.name,
            "Host attributes contain ';', which is not escaped and will be read back differently"
        );
    }

    let mut value = format!("{KEY_NAME}={};", host.name);
    if let Some(ref address) = host.address {
        value.push_str(&format!("{KEY_ADDRESS}={address};"));
    }
    value
}

pub(super) fn deserialize_host(mac: &str, data: &str) -> Host {
    let mut host = Host::new(mac, "");

    if !data.contains('=') {
        host.name = data.to_string();
        return host;
    }

    for pair in data.split(';').filter(|pair| !pair.is_empty()) {
        let Some((key, value)) = pair.split_once('=') else {
            warn!(
                data,
                "Received invalid host data from valkey, expected pairs key=value separated by semicolons"
            );
            continue;
        };
        match key {
            KEY_NAME => value.clone_into(&mut host.name),
            KEY_ADDRESS => host.address = Some(value.to_string()),
            _ => warn!(key, data, "Received unknown key in host data from valkey"),
        }
    }
    host
}
