use anyhow::Result;

fn main() -> Result<()> {
    let schema = schemars::schema_for!(mycap::Settings);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
