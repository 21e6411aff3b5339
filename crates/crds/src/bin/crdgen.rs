//! Prints the Device CRD manifest as YAML.

use crds::Device;
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    print!("{}", serde_yaml::to_string(&Device::crd())?);
    Ok(())
}
