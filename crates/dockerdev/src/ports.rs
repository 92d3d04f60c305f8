//! Published-port specs: `containerPort[:hostPort][/proto]`, comma-separated.

use crate::error::ParseError;
use std::fmt;

/// One entry of a published-ports spec.
///
/// An empty `host_port` lets the engine pick a random host port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortField {
    pub container_port: String,
    pub host_port: String,
    pub proto: String,
}

impl PortField {
    /// Engine key for this port, e.g. `3000/tcp`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.container_port, self.proto)
    }
}

impl fmt::Display for PortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ContainerPort={} HostPort={} Proto={}",
            self.container_port, self.host_port, self.proto
        )
    }
}

/// Parses a comma-separated published-ports spec. An empty spec is no ports.
pub fn parse_published_ports(csv: &str) -> Result<Vec<PortField>, ParseError> {
    if csv.is_empty() {
        return Ok(Vec::new());
    }
    csv.split(',').map(|entry| parse_port_field(entry.trim())).collect()
}

fn parse_port_field(value: &str) -> Result<PortField, ParseError> {
    let parts: Vec<&str> = value.split(':').collect();
    let (container_port, host_port, proto) = match parts.as_slice() {
        [single] => {
            let (port, proto) = parse_proto_field(single)?;
            (port, "", proto)
        }
        [container, host] => {
            let (port, proto) = parse_proto_field(host)?;
            (*container, port, proto)
        }
        _ => return Err(ParseError::InvalidPortField(value.to_string())),
    };

    check_port(container_port)?;
    if !host_port.is_empty() {
        check_port(host_port)?;
    }

    Ok(PortField {
        container_port: container_port.to_string(),
        host_port: host_port.to_string(),
        proto: proto.to_string(),
    })
}

fn parse_proto_field(value: &str) -> Result<(&str, &str), ParseError> {
    let parts: Vec<&str> = value.split('/').collect();
    match parts.as_slice() {
        [port] => Ok((*port, "tcp")),
        [port, proto] => Ok((*port, *proto)),
        _ => Err(ParseError::InvalidProtoField(value.to_string())),
    }
}

fn check_port(port: &str) -> Result<(), ParseError> {
    port.parse::<u16>()
        .map(|_| ())
        .map_err(|_| ParseError::InvalidPortNumber(port.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(container: &str, host: &str, proto: &str) -> PortField {
        PortField {
            container_port: container.into(),
            host_port: host.into(),
            proto: proto.into(),
        }
    }

    #[test]
    fn parses_host_and_proto() {
        let ports = parse_published_ports("3000:3001/tcp,8080:80").unwrap();
        assert_eq!(
            ports,
            vec![field("3000", "3001", "tcp"), field("8080", "80", "tcp")]
        );
    }

    #[test]
    fn container_port_only() {
        assert_eq!(
            parse_published_ports("9000").unwrap(),
            vec![field("9000", "", "tcp")]
        );
        assert_eq!(
            parse_published_ports("53/udp").unwrap(),
            vec![field("53", "", "udp")]
        );
    }

    #[test]
    fn empty_spec_is_empty() {
        assert!(parse_published_ports("").unwrap().is_empty());
    }

    #[test]
    fn rejects_malformed_entries() {
        assert_eq!(
            parse_published_ports("a:b:c"),
            Err(ParseError::InvalidPortField("a:b:c".into()))
        );
        assert_eq!(
            parse_published_ports("80:8080/tcp/x"),
            Err(ParseError::InvalidProtoField("8080/tcp/x".into()))
        );
        assert!(matches!(
            parse_published_ports("http:80"),
            Err(ParseError::InvalidPortNumber(_))
        ));
    }

    #[test]
    fn key_joins_port_and_proto() {
        assert_eq!(field("53", "", "udp").key(), "53/udp");
    }
}
