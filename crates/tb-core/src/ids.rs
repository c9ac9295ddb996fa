use core::fmt;

/// Identifier of a virtual machine hosting the managed application.
///
/// Hypervisor drivers name domains with strings (e.g. a libvirt domain
/// name), so the id is an owned string rather than a compact index.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VmId(String);

impl VmId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VmId({})", self.0)
    }
}

impl fmt::Display for VmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VmId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for VmId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
