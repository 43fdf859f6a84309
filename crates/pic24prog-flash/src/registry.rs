//! Programmer registry and factory
//!
//! This module maps programmer specification strings to line drivers.

use std::collections::HashMap;

use pic24prog_core::programmer::LineDriver;

/// Type alias for a boxed line driver
pub type BoxedDriver = Box<dyn LineDriver + Send>;

/// Parsed programmer parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

impl ProgrammerParams {
    /// Parameters as (key, value) pairs, the form driver crates accept
    pub fn options(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
///
/// # Example
/// ```ignore
/// let params = parse_programmer_params("CheapParport:dev=/dev/parport1")?;
/// assert_eq!(params.name, "CheapParport");
/// assert_eq!(params.params.get("dev"), Some(&"/dev/parport1".to_string()));
/// ```
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));
    if name.is_empty() {
        return Err("Empty programmer name".into());
    }

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open a line driver from a programmer specification
///
/// The port itself is claimed when a session starts; this only resolves
/// the name, validates the parameters and checks that the adapter exists.
///
/// # Arguments
/// * `programmer` - Programmer specification (e.g., "CheapParport" or "dummy:devid=080A")
pub fn open_programmer(programmer: &str) -> Result<BoxedDriver, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;
    let info = find_programmer(&params.name)
        .ok_or_else(|| format!("Unsupported programmer: {}", params.name))?;

    match info.name {
        #[cfg(feature = "dummy")]
        "dummy" => open_dummy(&params),

        #[cfg(feature = "parport")]
        "CheapParport" => open_cheap_parport(&params),

        _ => Err(format!("Unsupported programmer: {}", params.name).into()),
    }
}

// Programmer-specific open functions

#[cfg(feature = "dummy")]
fn open_dummy(params: &ProgrammerParams) -> Result<BoxedDriver, Box<dyn std::error::Error>> {
    use pic24prog_dummy::{parse_options, DummyPic};

    let config = parse_options(&params.options())
        .map_err(|e| format!("Invalid dummy parameters: {}", e))?;
    log::info!(
        "Using simulated target (DEVID 0x{:04X}, DEVREV 0x{:04X})",
        config.device_id,
        config.revision_id
    );
    Ok(Box::new(DummyPic::new(config)))
}

#[cfg(feature = "parport")]
fn open_cheap_parport(params: &ProgrammerParams) -> Result<BoxedDriver, Box<dyn std::error::Error>> {
    use pic24prog_parport::{parse_options, CheapParport};

    log::info!("Opening CheapParport programmer...");

    let config = parse_options(&params.options())
        .map_err(|e| format!("Invalid CheapParport parameters: {}", e))?;

    let port = CheapParport::probe(config).map_err(|e| {
        format!(
            "Failed to open parallel port: {}\n\
             Make sure the ppdev module is loaded and you have read/write permissions.\n\
             You may need to: sudo usermod -aG lp $USER",
            e
        )
    })?;

    Ok(Box::new(port))
}

// Programmer information and listing
/// Information about a programmer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

impl ProgrammerInfo {
    /// Whether `name` refers to this programmer
    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.aliases.contains(&name)
    }
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "parport")]
    programmers.push(ProgrammerInfo {
        name: "CheapParport",
        aliases: &["cheapparport", "parport"],
        description: "Bit-bang adapter on a PC parallel port via ppdev (dev=/dev/parportN)",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "Simulated dsPIC33 target for testing (devid=<hex>,revid=<hex>,stall=1)",
    });

    programmers
}

/// Look up a programmer by name or alias
pub fn find_programmer(name: &str) -> Option<ProgrammerInfo> {
    available_programmers().into_iter().find(|p| p.matches(name))
}

/// Generate a short list of programmer names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    if programmers.is_empty() {
        return "none (recompile with features)".to_string();
    }
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let params = parse_programmer_params("CheapParport").unwrap();
        assert_eq!(params.name, "CheapParport");
        assert!(params.params.is_empty());
    }

    #[test]
    fn test_parse_with_params() {
        let params = parse_programmer_params("dummy:devid=080A,stall=1").unwrap();
        assert_eq!(params.name, "dummy");
        assert_eq!(params.params.get("devid"), Some(&"080A".to_string()));
        assert_eq!(params.params.get("stall"), Some(&"1".to_string()));
        assert_eq!(params.options().len(), 2);
    }

    #[test]
    fn test_parse_rejects_bad_params() {
        assert!(parse_programmer_params("dummy:devid").is_err());
        assert!(parse_programmer_params(":dev=/dev/parport0").is_err());
    }

    #[test]
    fn test_unknown_programmer() {
        assert!(find_programmer("ch341a").is_none());
        let err = open_programmer("ch341a").err().unwrap();
        assert!(err.to_string().contains("Unsupported programmer"));
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        use pic24prog_core::protocol::Pic24Programmer;

        let driver = open_programmer("dummy:devid=0x080B").unwrap();
        let mut prog = Pic24Programmer::new(driver);
        prog.begin().unwrap();
        assert_eq!(prog.read_device_id().unwrap().device, 0x080B);
        prog.end().unwrap();
    }

    #[cfg(feature = "parport")]
    #[test]
    fn test_parport_aliases() {
        assert_eq!(find_programmer("parport").unwrap().name, "CheapParport");
        assert_eq!(find_programmer("cheapparport").unwrap().name, "CheapParport");
        assert!(open_programmer("CheapParport:dev=/nonexistent/parport").is_err());
    }
}
