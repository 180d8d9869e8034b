use ectoplasm_dex::dex::factory::{Factory, FactoryInitArgs};
use ectoplasm_dex::dex::pair::PairFactory;
use ectoplasm_dex::dex::router::{Router, RouterInitArgs};
use ectoplasm_dex::tokens::{
    DeflatingToken, DeflatingTokenInitArgs, TestToken, TestTokenInitArgs, Wcspr,
};
use odra::casper_types::U256;
use odra::host::{HostEnv, NoArgs};
use odra::prelude::{Address, Addressable};
use odra::schema::casper_contract_schema::NamedCLType;
use odra_cli::{
    deploy::DeployScript,
    scenario::{Args, Error, Scenario, ScenarioMetadata},
    CommandArg, ContractProvider, DeployedContractsContainer, DeployerExt, OdraCli,
};
use std::fs::File;
use std::io::Write;
use std::process::Command;

const ENV_FILE: &str = "scripts/deploy-dex.out.env";

/// Deploys WCSPR, the test tokens, PairFactory, Factory and Router.
pub struct DeployDexScript;

impl DeployScript for DeployDexScript {
    fn deploy(
        &self,
        env: &HostEnv,
        container: &mut DeployedContractsContainer,
    ) -> Result<(), odra_cli::deploy::Error> {
        let caller = env.caller();

        println!("==> Deploying Tokens");
        let wcspr = Wcspr::load_or_deploy(env, NoArgs, container, 600_000_000_000)?;
        println!("WCSPR deployed at: {:?}", wcspr.address());

        let test_token = TestToken::load_or_deploy(
            env,
            TestTokenInitArgs {
                name: String::from("DEX Test Token"),
                symbol: String::from("DTK"),
                initial_supply: U256::from(1_000_000_000u64) * U256::exp10(18),
            },
            container,
            600_000_000_000,
        )?;
        println!("DTK deployed at: {:?}", test_token.address());

        let deflating = DeflatingToken::load_or_deploy(
            env,
            DeflatingTokenInitArgs {
                initial_supply: U256::from(1_000_000_000u64) * U256::exp10(18),
            },
            container,
            600_000_000_000,
        )?;
        println!("DTT deployed at: {:?}", deflating.address());

        println!("==> Deploying PairFactory");
        // Carries the pair code, hence the gas
        let pair_factory = PairFactory::load_or_deploy(env, NoArgs, container, 750_000_000_000)?;
        println!("PairFactory deployed at: {:?}", pair_factory.address());

        println!("==> Deploying Factory");
        let factory = Factory::load_or_deploy(
            env,
            FactoryInitArgs {
                fee_to_setter: caller,
                operator_fee_setter: caller,
                pair_factory: pair_factory.address(),
            },
            container,
            500_000_000_000,
        )?;
        println!("Factory deployed at: {:?}", factory.address());

        println!("==> Deploying Router");
        let router = Router::load_or_deploy(
            env,
            RouterInitArgs {
                factory: factory.address(),
                wcspr: wcspr.address(),
            },
            container,
            600_000_000_000,
        )?;
        println!("Router deployed at: {:?}", router.address());

        if let Err(err) = generate_env_file(container) {
            eprintln!("Could not write {}: {}", ENV_FILE, err);
        }
        Ok(())
    }
}

/// Scenario to create a new trading pair.
pub struct CreatePairScenario;

impl Scenario for CreatePairScenario {
    fn args(&self) -> Vec<CommandArg> {
        vec![
            CommandArg::new("token_a", "Address of the first token", NamedCLType::Key),
            CommandArg::new("token_b", "Address of the second token", NamedCLType::Key),
        ]
    }

    fn run(
        &self,
        env: &HostEnv,
        container: &DeployedContractsContainer,
        args: Args,
    ) -> Result<(), Error> {
        let mut factory = container.contract_ref::<Factory>(env)?;
        let token_a = args.get_single::<Address>("token_a")?;
        let token_b = args.get_single::<Address>("token_b")?;

        println!("Pair handle: {:?}", factory.pair_handle(token_a, token_b));
        env.set_gas(900_000_000_000);
        let pair = factory.try_create_pair(token_a, token_b)?;

        println!("Pair created at: {:?}", pair);
        Ok(())
    }
}

impl ScenarioMetadata for CreatePairScenario {
    const NAME: &'static str = "create-pair";
    const DESCRIPTION: &'static str = "Creates a new trading pair for two tokens";
}

/// Scenario to change the swap fee and the protocol fee share.
pub struct SetMainFeesScenario;

impl Scenario for SetMainFeesScenario {
    fn args(&self) -> Vec<CommandArg> {
        vec![
            CommandArg::new(
                "total_fee",
                "Swap fee in thousandths (3 = 0.3%)",
                NamedCLType::U32,
            ),
            CommandArg::new(
                "protocol_fee",
                "Protocol share of fee growth in ten-thousandths",
                NamedCLType::U32,
            ),
        ]
    }

    fn run(
        &self,
        env: &HostEnv,
        container: &DeployedContractsContainer,
        args: Args,
    ) -> Result<(), Error> {
        let mut factory = container.contract_ref::<Factory>(env)?;
        let total_fee = args.get_single::<u32>("total_fee")?;
        let protocol_fee = args.get_single::<u32>("protocol_fee")?;

        env.set_gas(5_000_000_000);
        factory.try_set_main_fees(total_fee, protocol_fee)?;

        let info = factory.all_info();
        println!(
            "Main fees set: total_fee={} protocol_fee={}",
            info.total_fee, info.protocol_fee
        );
        Ok(())
    }
}

impl ScenarioMetadata for SetMainFeesScenario {
    const NAME: &'static str = "set-main-fees";
    const DESCRIPTION: &'static str = "Sets the swap fee and the protocol fee share";
}

fn generate_env_file(container: &DeployedContractsContainer) -> std::io::Result<()> {
    println!("==> Generating {}", ENV_FILE);
    let node_address = std::env::var("ODRA_CASPER_LIVENET_NODE_ADDRESS")
        .or_else(|_| std::env::var("NODE_ADDRESS"))
        .unwrap_or_default();
    let chain_name = std::env::var("ODRA_CASPER_LIVENET_CHAIN_NAME")
        .or_else(|_| std::env::var("CHAIN_NAME"))
        .unwrap_or_else(|_| "casper-test".to_string());

    let mut file = File::create(ENV_FILE)?;
    writeln!(file, "NODE_ADDRESS={}", node_address)?;
    writeln!(file, "CHAIN_NAME={}", chain_name)?;
    writeln!(file)?;

    let mappings = [
        ("PairFactory", "PAIR_FACTORY"),
        ("Factory", "FACTORY"),
        ("Router", "ROUTER"),
        ("Wcspr", "WCSPR"),
        ("TestToken", "DTK"),
        ("DeflatingToken", "DTT"),
    ];

    for (contract_name, env_prefix) in mappings {
        if let Some(address) = container.address_by_name(contract_name) {
            // Contract(ContractPackageHash(<hex>))
            let hex_part = address
                .to_string()
                .replace("Contract(ContractPackageHash(", "")
                .replace("))", "");
            let package_hash = format!("hash-{}", hex_part);
            writeln!(file, "{}_PACKAGE_HASH={}", env_prefix, package_hash)?;

            let contract_hash = get_contract_hash(&node_address, &package_hash);
            writeln!(file, "{}_CONTRACT_HASH={}", env_prefix, contract_hash)?;
        }
    }
    Ok(())
}

/// Latest contract hash of a package, via `casper-client`.
fn get_contract_hash(node_address: &str, package_hash: &str) -> String {
    let output = Command::new("casper-client")
        .arg("query-global-state")
        .arg("--node-address")
        .arg(node_address)
        .arg("--key")
        .arg(package_hash)
        .output();

    let Ok(out) = output else {
        return String::from("ERROR_CALLING_CLIENT");
    };
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .filter(|line| line.contains("contract_hash"))
        .filter_map(|line| {
            let start = line.find("contract-")?;
            let end = line[start..].find('"').unwrap_or(line.len() - start);
            Some(line[start..start + end].to_string())
        })
        .last()
        .unwrap_or_else(|| String::from("NOT_FOUND"))
}

pub fn main() {
    OdraCli::new()
        .about("CLI tool for the constant-product DEX contracts")
        // Deploy scripts
        .deploy(DeployDexScript)
        // Contract references
        .contract::<Factory>()
        .contract::<PairFactory>()
        .contract::<Router>()
        .contract::<Wcspr>()
        .contract::<TestToken>()
        .contract::<DeflatingToken>()
        // Scenarios
        .scenario(CreatePairScenario)
        .scenario(SetMainFeesScenario)
        .build()
        .run();
}
