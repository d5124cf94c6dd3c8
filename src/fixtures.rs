#[cfg(test)]
pub mod test {
    /// A complete installer configuration, in the layout the installer ships.
    pub const INSTALLER_CONFIG: &str = r#"---
# Trusted Software Supply Chain installer configuration.
tssc:
  # Namespace where the installer's own resources are deployed.
  namespace: tssc
  settings:
    # Enables CodeReady Containers specific tweaks.
    crc: false
    ci:
      debug: false
  products:
    - name: Trusted Artifact Signer
      enabled: true
      namespace: tssc-tas
    - name: Trusted Profile Analyzer
      enabled: true
      namespace: tssc-tpa
      properties:
        manageSecrets: true
    - name: Developer Hub
      enabled: true
      namespace: tssc-dh
      properties:
        catalogURL: https://github.com/redhat-appstudio/tssc-sample-templates/blob/main/all.yaml
        authProvider: github  # github, gitlab or oidc
    - name: Advanced Cluster Security
      enabled: false
      namespace: tssc-acs
      properties:
        manageSecrets: false
"#;

    /// Minimal valid configuration with three products, only the last two enabled.
    pub const MINIMAL_CONFIG: &str = r#"---
tssc:
  namespace: installer
  settings: {}
  products:
    - name: A
      enabled: false
    - name: B
      enabled: true
      namespace: b
    - name: C
      enabled: true
      namespace: c
"#;
}
