//! SSDP message parsing and formatting.
//!
//! Only the subset a Hue bridge needs: parsing incoming `M-SEARCH`
//! requests and rendering search responses plus `NOTIFY` announcements.

use std::net::{Ipv4Addr, SocketAddrV4};

use huehub_domain::identity::HubIdentity;

/// SSDP multicast group.
pub const MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);

/// SSDP port.
pub const SSDP_PORT: u16 = 1900;

/// Multicast destination of `NOTIFY` messages.
pub const MULTICAST_DEST: SocketAddrV4 = SocketAddrV4::new(MULTICAST_ADDR, SSDP_PORT);

const SEARCH_ALL: &str = "ssdp:all";
const ROOT_DEVICE: &str = "upnp:rootdevice";
const BASIC_DEVICE: &str = "urn:schemas-upnp-org:device:basic:1";
const SERVER: &str = "Linux/3.14.0 UPnP/1.0 IpBridge/1.65.0";

/// An `M-SEARCH` request received on the multicast group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    /// Search target (`ST` header).
    pub st: String,
}

impl SearchRequest {
    /// Parse an `M-SEARCH` datagram.
    ///
    /// Returns `None` for any other SSDP message, for a missing `ST` header
    /// and when `MAN` is not `"ssdp:discover"`.
    #[must_use]
    pub fn parse(datagram: &str) -> Option<Self> {
        let mut lines = datagram.lines();
        let request_line = lines.next()?.trim();
        if !request_line
            .get(..8)
            .is_some_and(|method| method.eq_ignore_ascii_case("M-SEARCH"))
        {
            return None;
        }

        let mut st = None;
        let mut discover = false;
        for line in lines.map(str::trim) {
            if let Some(value) = extract_header_value(line, "ST:") {
                st = Some(value.to_string());
            } else if let Some(value) = extract_header_value(line, "MAN:") {
                discover = value.trim_matches('"').eq_ignore_ascii_case("ssdp:discover");
            }
        }

        st.filter(|_| discover).map(|st| Self { st })
    }
}

/// Extract the value of `header` from a `HEADER: value` line.
fn extract_header_value<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    let name = line.get(..header.len())?;
    if name.eq_ignore_ascii_case(header) {
        Some(line[header.len()..].trim())
    } else {
        None
    }
}

/// What one hub advertises over SSDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    location: String,
    bridge_id: String,
    bridge_uuid: String,
    max_age_secs: u16,
}

impl Advertisement {
    /// Build the advertisement of a hub reachable at `host:port`.
    #[must_use]
    pub fn new(
        protocol: &str,
        host: &str,
        port: u16,
        identity: &HubIdentity,
        max_age_secs: u16,
    ) -> Self {
        Self {
            location: format!("{protocol}://{host}:{port}/description.xml"),
            bridge_id: identity.bridge_id.clone(),
            bridge_uuid: identity.bridge_uuid.clone(),
            max_age_secs,
        }
    }

    /// `LOCATION` header value.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    fn uuid_target(&self) -> String {
        format!("uuid:{}", self.bridge_uuid)
    }

    /// Notification types announced with `NOTIFY`.
    #[must_use]
    pub fn notification_types(&self) -> Vec<String> {
        vec![ROOT_DEVICE.to_string(), self.uuid_target(), BASIC_DEVICE.to_string()]
    }

    /// Search targets this hub answers for a request with `st`.
    ///
    /// `ssdp:all` yields every notification type; a specific target yields
    /// itself when it is one of ours; anything else yields nothing.
    #[must_use]
    pub fn answers(&self, st: &str) -> Vec<String> {
        if st.eq_ignore_ascii_case(SEARCH_ALL) {
            return self.notification_types();
        }
        self.notification_types()
            .into_iter()
            .filter(|target| target.eq_ignore_ascii_case(st))
            .collect()
    }

    /// `USN` for a notification type: the bare uuid for the uuid target,
    /// `uuid:<bridge uuid>::<nt>` otherwise.
    #[must_use]
    pub fn usn(&self, nt: &str) -> String {
        let uuid = self.uuid_target();
        if nt == uuid {
            uuid
        } else {
            format!("{uuid}::{nt}")
        }
    }

    /// Unicast reply to an `M-SEARCH`.
    #[must_use]
    pub fn search_response(&self, st: &str) -> String {
        format!(
            "HTTP/1.1 200 OK\r\n\
             HOST: {MULTICAST_DEST}\r\n\
             EXT:\r\n\
             CACHE-CONTROL: max-age={max_age}\r\n\
             LOCATION: {location}\r\n\
             SERVER: {SERVER}\r\n\
             hue-bridgeid: {bridge_id}\r\n\
             ST: {st}\r\n\
             USN: {usn}\r\n\
             \r\n",
            max_age = self.max_age_secs,
            location = self.location,
            bridge_id = self.bridge_id,
            usn = self.usn(st),
        )
    }

    /// `NOTIFY ssdp:alive` for one notification type.
    #[must_use]
    pub fn notify_alive(&self, nt: &str) -> String {
        format!(
            "NOTIFY * HTTP/1.1\r\n\
             HOST: {MULTICAST_DEST}\r\n\
             CACHE-CONTROL: max-age={max_age}\r\n\
             LOCATION: {location}\r\n\
             SERVER: {SERVER}\r\n\
             NTS: ssdp:alive\r\n\
             hue-bridgeid: {bridge_id}\r\n\
             NT: {nt}\r\n\
             USN: {usn}\r\n\
             \r\n",
            max_age = self.max_age_secs,
            location = self.location,
            bridge_id = self.bridge_id,
            usn = self.usn(nt),
        )
    }

    /// `NOTIFY ssdp:byebye` for one notification type.
    #[must_use]
    pub fn notify_byebye(&self, nt: &str) -> String {
        format!(
            "NOTIFY * HTTP/1.1\r\n\
             HOST: {MULTICAST_DEST}\r\n\
             NTS: ssdp:byebye\r\n\
             NT: {nt}\r\n\
             USN: {usn}\r\n\
             \r\n",
            usn = self.usn(nt),
        )
    }
}
