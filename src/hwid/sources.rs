//! Platform hardware identifier sources
//!
//! Each source reads one platform identifier. Sources report failure instead of
//! returning placeholders, so the resolver can fall back to the next source.

use sha2::{Digest, Sha256};
use std::path::Path;

use super::HwidSource;
use crate::error::IdentityError;

/// A single place a machine identifier can be read from
pub trait IdentitySource: Send + Sync {
    /// Which kind of identifier this source yields
    fn kind(&self) -> HwidSource;

    /// Short name used in diagnostics
    fn name(&self) -> &'static str;

    /// Read the raw identifier
    ///
    /// # Errors
    ///
    /// Returns an error if the platform does not expose the identifier or it
    /// could not be read.
    fn read(&self) -> Result<String, IdentityError>;
}

/// Platform system/product UUID (SMBIOS UUID, `IOPlatformUUID`, machine-id)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemUuidSource;

/// Processor identifier (`ProcessorId`, CPU serial, or a CPU signature digest)
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessorIdSource;

impl IdentitySource for SystemUuidSource {
    fn kind(&self) -> HwidSource {
        HwidSource::SystemUuid
    }

    fn name(&self) -> &'static str {
        "system UUID"
    }

    fn read(&self) -> Result<String, IdentityError> {
        read_system_uuid().map_err(|reason| IdentityError::Unavailable {
            source_name: self.name(),
            reason,
        })
    }
}

impl IdentitySource for ProcessorIdSource {
    fn kind(&self) -> HwidSource {
        HwidSource::ProcessorId
    }

    fn name(&self) -> &'static str {
        "processor ID"
    }

    fn read(&self) -> Result<String, IdentityError> {
        read_processor_id().map_err(|reason| IdentityError::Unavailable {
            source_name: self.name(),
            reason,
        })
    }
}

/// Trim a raw identifier and reject empty or well-known placeholder values
///
/// # Errors
///
/// Returns `IdentityError::Placeholder` when nothing usable remains.
pub(crate) fn sanitize_identifier(
    source_name: &'static str,
    kind: HwidSource,
    raw: &str,
) -> Result<String, IdentityError> {
    let trimmed = raw.trim().trim_matches('\0').trim();
    let placeholder = trimmed.is_empty()
        || trimmed.chars().all(|c| c == '0' || c == '-')
        || trimmed
            .chars()
            .all(|c| c.eq_ignore_ascii_case(&'f') || c == '-')
        || trimmed.eq_ignore_ascii_case("none")
        || trimmed.eq_ignore_ascii_case("to be filled by o.e.m.");

    if placeholder {
        return Err(IdentityError::Placeholder {
            source_name,
            value: trimmed.to_string(),
        });
    }

    match kind {
        HwidSource::SystemUuid => Ok(normalize_uuid(trimmed)),
        HwidSource::ProcessorId | HwidSource::Unknown => Ok(trimmed.to_string()),
    }
}

/// Upper-case hyphenated form for anything that parses as a UUID (including the
/// 32-hex-digit machine-id format); other values are returned unchanged
pub(crate) fn normalize_uuid(value: &str) -> String {
    uuid::Uuid::try_parse(value).map_or_else(
        |_| value.to_string(),
        |parsed| parsed.hyphenated().to_string().to_uppercase(),
    )
}

/// Digest of CPU description fields, used where no CPU serial is exposed
#[cfg_attr(target_os = "windows", allow(dead_code))]
pub(crate) fn hash_components(components: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(components.join("|").as_bytes());
    let digest = hasher.finalize();
    hex::encode_upper(&digest[..16])
}

/// Derive a processor identifier from `/proc/cpuinfo` content
///
/// Prefers an explicit non-zero `Serial` (ARM boards); otherwise hashes the
/// first processor's fixed model fields. Kernel-reported feature flags are left
/// out since they change with kernel, microcode and mitigation updates.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn processor_id_from_cpuinfo(content: &str) -> Option<String> {
    const SIGNATURE_FIELDS: &[&str] = &[
        "vendor_id",
        "cpu family",
        "model",
        "stepping",
        "CPU implementer",
        "CPU architecture",
        "CPU variant",
        "CPU part",
        "CPU revision",
    ];

    let fields: Vec<(&str, &str)> = content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect();

    if let Some((_, serial)) = fields.iter().find(|(key, _)| *key == "Serial") {
        if !serial.is_empty() && !serial.chars().all(|c| c == '0') {
            return Some(serial.to_uppercase());
        }
    }

    let components: Vec<String> = SIGNATURE_FIELDS
        .iter()
        .filter_map(|wanted| {
            fields
                .iter()
                .find(|(key, _)| key == wanted)
                .map(|(key, value)| format!("{key}={value}"))
        })
        .collect();

    if components.is_empty() {
        None
    } else {
        Some(hash_components(&components))
    }
}

/// Extract `IOPlatformUUID` from `ioreg -rd1 -c IOPlatformExpertDevice` output
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn parse_ioreg_uuid(output: &str) -> Option<String> {
    output
        .lines()
        .find(|line| line.contains("IOPlatformUUID"))
        .and_then(|line| line.split('"').nth(3))
        .map(String::from)
}

/// Extract the value row from `wmic <class> get <Property>` output
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn parse_wmic_value(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .nth(1)
        .map(String::from)
}

/// Read `paths` in order and return the first one holding a usable identifier
///
/// Placeholder contents (e.g. an all-zero DMI UUID on a VM) move on to the next
/// path instead of failing the whole source.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
pub(crate) fn read_first_usable<P: AsRef<Path>>(
    source_name: &'static str,
    paths: &[P],
) -> Result<String, String> {
    let mut errors = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(content) => match sanitize_identifier(source_name, HwidSource::SystemUuid, &content) {
                Ok(value) => return Ok(value),
                Err(e) => errors.push(format!("{}: {e}", path.display())),
            },
            Err(e) => errors.push(format!("{}: {e}", path.display())),
        }
    }
    Err(errors.join("; "))
}

/// Use `primary` if it produced a value, otherwise run `fallback`
///
/// Both failure reasons are kept when the fallback fails too.
#[cfg_attr(not(target_os = "windows"), allow(dead_code))]
pub(crate) fn or_fallback(
    primary: Result<String, String>,
    fallback: impl FnOnce() -> Result<String, String>,
) -> Result<String, String> {
    primary.or_else(|primary_error| {
        fallback().map_err(|fallback_error| format!("{primary_error}; {fallback_error}"))
    })
}

#[cfg_attr(target_os = "linux", allow(dead_code))]
fn run_command(program: &str, args: &[&str]) -> Result<String, String> {
    let output = std::process::Command::new(program)
        .args(args)
        .output()
        .map_err(|e| format!("{program} could not be started: {e}"))?;
    if !output.status.success() {
        return Err(format!("{program} exited with {}", output.status));
    }
    String::from_utf8(output.stdout).map_err(|e| format!("{program} produced invalid UTF-8: {e}"))
}

fn read_system_uuid() -> Result<String, String> {
    #[cfg(target_os = "linux")]
    {
        const CANDIDATES: &[&str] = &[
            "/sys/class/dmi/id/product_uuid",
            "/etc/machine-id",
            "/var/lib/dbus/machine-id",
        ];
        read_first_usable("system UUID", CANDIDATES)
    }

    #[cfg(target_os = "macos")]
    {
        let output = run_command("ioreg", &["-rd1", "-c", "IOPlatformExpertDevice"])?;
        parse_ioreg_uuid(&output).ok_or_else(|| "IOPlatformUUID not found in ioreg output".to_string())
    }

    #[cfg(target_os = "windows")]
    {
        let wmic = run_command("wmic", &["csproduct", "get", "UUID"]).and_then(|output| {
            parse_wmic_value(&output).ok_or_else(|| "wmic returned no UUID".to_string())
        });
        or_fallback(wmic, || {
            run_command(
                "powershell",
                &[
                    "-NoProfile",
                    "-Command",
                    "(Get-CimInstance -ClassName Win32_ComputerSystemProduct).UUID",
                ],
            )
        })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Err(format!("not supported on {}", std::env::consts::OS))
    }
}

fn read_processor_id() -> Result<String, String> {
    #[cfg(target_os = "linux")]
    {
        let content = std::fs::read_to_string("/proc/cpuinfo")
            .map_err(|e| format!("/proc/cpuinfo: {e}"))?;
        processor_id_from_cpuinfo(&content)
            .ok_or_else(|| "no identifying fields in /proc/cpuinfo".to_string())
    }

    #[cfg(target_os = "macos")]
    {
        let output = run_command(
            "sysctl",
            &["-n", "machdep.cpu.brand_string", "machdep.cpu.signature"],
        )?;
        let components: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        if components.is_empty() {
            Err("sysctl returned no CPU description".to_string())
        } else {
            Ok(hash_components(&components))
        }
    }

    #[cfg(target_os = "windows")]
    {
        let wmic = run_command("wmic", &["cpu", "get", "ProcessorId"]).and_then(|output| {
            parse_wmic_value(&output).ok_or_else(|| "wmic returned no ProcessorId".to_string())
        });
        or_fallback(wmic, || {
            run_command(
                "powershell",
                &[
                    "-NoProfile",
                    "-Command",
                    "(Get-CimInstance -ClassName Win32_Processor | Select-Object -First 1).ProcessorId",
                ],
            )
        })
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
    {
        Err(format!("not supported on {}", std::env::consts::OS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X86_CPUINFO: &str = "processor\t: 0\n\
        vendor_id\t: GenuineIntel\n\
        cpu family\t: 6\n\
        model\t\t: 142\n\
        model name\t: Intel(R) Core(TM) i7-8565U CPU @ 1.80GHz\n\
        stepping\t: 12\n\
        flags\t\t: fpu vme de pse tsc msr\n\
        \n\
        processor\t: 1\n\
        vendor_id\t: GenuineIntel\n";

    #[test]
    fn test_sanitize_rejects_placeholders() {
        for raw in [
            "",
            "   \n",
            "00000000-0000-0000-0000-000000000000",
            "FFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF",
            "To Be Filled By O.E.M.",
        ] {
            assert!(
                sanitize_identifier("system UUID", HwidSource::SystemUuid, raw).is_err(),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_sanitize_normalizes_uuid() {
        let value = sanitize_identifier(
            "system UUID",
            HwidSource::SystemUuid,
            "4c4c4544-0033-5910-8052-b4c04f4e4b32\n",
        )
        .unwrap();
        assert_eq!(value, "4C4C4544-0033-5910-8052-B4C04F4E4B32");
    }

    #[test]
    fn test_sanitize_machine_id_format() {
        let value = sanitize_identifier(
            "system UUID",
            HwidSource::SystemUuid,
            "b08dfa6083e7567a1921a715000001fb\n",
        )
        .unwrap();
        assert_eq!(value, "B08DFA60-83E7-567A-1921-A715000001FB");
    }

    #[test]
    fn test_sanitize_keeps_processor_id_verbatim() {
        let value =
            sanitize_identifier("processor ID", HwidSource::ProcessorId, " BFEBFBFF000806EC ")
                .unwrap();
        assert_eq!(value, "BFEBFBFF000806EC");
    }

    #[test]
    fn test_cpuinfo_signature_is_stable() {
        let first = processor_id_from_cpuinfo(X86_CPUINFO).unwrap();
        let second = processor_id_from_cpuinfo(X86_CPUINFO).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
    }

    #[test]
    fn test_cpuinfo_ignores_feature_flags() {
        let updated = X86_CPUINFO.replace("tsc msr", "tsc msr md_clear spec_ctrl");
        assert_eq!(
            processor_id_from_cpuinfo(X86_CPUINFO),
            processor_id_from_cpuinfo(&updated)
        );

        let arm = "CPU implementer\t: 0x41\nCPU architecture: 8\nCPU variant\t: 0x0\n\
                   CPU part\t: 0xd08\nCPU revision\t: 3\nFeatures\t: fp asimd\n";
        let arm_updated = arm.replace("fp asimd", "fp asimd evtstrm crc32");
        assert_eq!(
            processor_id_from_cpuinfo(arm),
            processor_id_from_cpuinfo(&arm_updated)
        );
    }

    #[test]
    fn test_cpuinfo_model_change_changes_id() {
        let other = X86_CPUINFO.replace("stepping\t: 12", "stepping\t: 11");
        assert_ne!(
            processor_id_from_cpuinfo(X86_CPUINFO),
            processor_id_from_cpuinfo(&other)
        );
    }

    #[test]
    fn test_placeholder_file_falls_through_to_machine_id() {
        let dir = tempfile::tempdir().unwrap();
        let product_uuid = dir.path().join("product_uuid");
        let machine_id = dir.path().join("machine-id");
        std::fs::write(&product_uuid, "00000000-0000-0000-0000-000000000000\n").unwrap();
        std::fs::write(&machine_id, "b08dfa6083e7567a1921a715000001fb\n").unwrap();

        let value = read_first_usable("system UUID", &[&product_uuid, &machine_id]).unwrap();
        assert_eq!(value, "B08DFA60-83E7-567A-1921-A715000001FB");
    }

    #[test]
    fn test_first_usable_reports_every_path() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("product_uuid");
        let missing = dir.path().join("machine-id");
        std::fs::write(&empty, "\n").unwrap();

        let err = read_first_usable("system UUID", &[&empty, &missing]).unwrap_err();
        assert!(err.contains("product_uuid"));
        assert!(err.contains("machine-id"));
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let used = or_fallback(Err("wmic missing".to_string()), || {
            Ok("BFEBFBFF000906EA".to_string())
        });
        assert_eq!(used.as_deref(), Ok("BFEBFBFF000906EA"));

        let primary = or_fallback(Ok("FROM-WMIC".to_string()), || {
            panic!("fallback must not run")
        });
        assert_eq!(primary.as_deref(), Ok("FROM-WMIC"));

        let both = or_fallback(Err("wmic missing".to_string()), || {
            Err("powershell missing".to_string())
        })
        .unwrap_err();
        assert_eq!(both, "wmic missing; powershell missing");
    }

    #[test]
    fn test_cpuinfo_prefers_serial() {
        let cpuinfo = "Hardware\t: BCM2835\nRevision\t: c03111\nSerial\t\t: 10000000a3b2c1d0\n";
        assert_eq!(
            processor_id_from_cpuinfo(cpuinfo).as_deref(),
            Some("10000000A3B2C1D0")
        );
    }

    #[test]
    fn test_cpuinfo_without_fields() {
        assert!(processor_id_from_cpuinfo("processor : 0\n").is_none());
    }

    #[test]
    fn test_parse_ioreg_uuid() {
        let output = r#"+-o MacBookPro18,3  <class IOPlatformExpertDevice>
    {
      "IOPlatformSerialNumber" = "C02XXXXXXX"
      "IOPlatformUUID" = "6B9D9F2E-1C1A-5F3B-9A1D-0E6C7F1A2B3C"
    }"#;
        assert_eq!(
            parse_ioreg_uuid(output).as_deref(),
            Some("6B9D9F2E-1C1A-5F3B-9A1D-0E6C7F1A2B3C")
        );
    }

    #[test]
    fn test_parse_wmic_value() {
        let output = "ProcessorId      \r\r\nBFEBFBFF000906EA  \r\r\n\r\r\n";
        assert_eq!(parse_wmic_value(output).as_deref(), Some("BFEBFBFF000906EA"));
        assert!(parse_wmic_value("UUID\r\n\r\n").is_none());
    }
}
