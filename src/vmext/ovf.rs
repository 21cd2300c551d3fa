use super::VmExtError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs;
use std::path::Path;

/// Provisioning document the agent leaves behind after first boot
pub const OVF_ENV_PATH: &str = "/var/lib/waagent/ovf-env.xml";

const USER_NAME_PATH: &[&[u8]] = &[
    b"ProvisioningSection",
    b"LinuxProvisioningConfigurationSet",
    b"UserName",
];

/// Name of the admin user created when the VM was provisioned
pub fn provisioned_user(path: &Path) -> Result<String, VmExtError> {
    let content = fs::read_to_string(path).map_err(|e| VmExtError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_user_name(&content, path)
}

/// Element names are matched without their namespace prefix
fn parse_user_name(content: &str, path: &Path) -> Result<String, VmExtError> {
    let xml_err = |e: quick_xml::Error| VmExtError::Xml {
        path: path.to_path_buf(),
        source: e,
    };

    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => stack.push(e.local_name().as_ref().to_vec()),
            Event::End(_) => {
                stack.pop();
            }
            Event::Text(t) if ends_with_path(&stack, USER_NAME_PATH) => {
                let name = t.unescape().map_err(xml_err)?;
                if !name.is_empty() {
                    return Ok(name.into_owned());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(VmExtError::NoUserName {
        path: path.to_path_buf(),
    })
}

fn ends_with_path(stack: &[Vec<u8>], suffix: &[&[u8]]) -> bool {
    stack.len() >= suffix.len()
        && stack[stack.len() - suffix.len()..]
            .iter()
            .zip(suffix)
            .all(|(a, b)| a.as_slice() == *b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const OVF_ENV: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ns0:Environment xmlns:ns0="http://schemas.dmtf.org/ovf/environment/1" xmlns:ns1="http://schemas.microsoft.com/windowsazure">
  <ns0:PlatformSettingsSection>
    <ns1:PlatformSettings>
      <ns1:KmsServerHostname>kms.core.windows.net</ns1:KmsServerHostname>
    </ns1:PlatformSettings>
  </ns0:PlatformSettingsSection>
  <ns1:ProvisioningSection>
    <ns1:Version>1.0</ns1:Version>
    <ns1:LinuxProvisioningConfigurationSet>
      <ns1:ConfigurationSetType>LinuxProvisioningConfiguration</ns1:ConfigurationSetType>
      <ns1:HostName>docker-vm</ns1:HostName>
      <ns1:UserName>azureuser</ns1:UserName>
      <ns1:DisableSshPasswordAuthentication>true</ns1:DisableSshPasswordAuthentication>
    </ns1:LinuxProvisioningConfigurationSet>
  </ns1:ProvisioningSection>
</ns0:Environment>"#;

    #[test]
    fn test_provisioned_user() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ovf-env.xml");
        fs::write(&path, OVF_ENV).unwrap();
        assert_eq!(provisioned_user(&path).unwrap(), "azureuser");
    }

    #[test]
    fn test_unprefixed_elements() {
        let xml = "<Environment><ProvisioningSection><LinuxProvisioningConfigurationSet>\
                   <UserName>ops</UserName>\
                   </LinuxProvisioningConfigurationSet></ProvisioningSection></Environment>";
        assert_eq!(parse_user_name(xml, Path::new("ovf-env.xml")).unwrap(), "ops");
    }

    #[test]
    fn test_user_name_outside_provisioning_section() {
        let xml = "<Environment><UserName>nobody</UserName></Environment>";
        assert!(matches!(
            parse_user_name(xml, Path::new("ovf-env.xml")),
            Err(VmExtError::NoUserName { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            provisioned_user(Path::new("/nonexistent/ovf-env.xml")),
            Err(VmExtError::Read { .. })
        ));
    }
}
