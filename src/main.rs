use bitmessage_core::core::payload::{GenericPayload, ObjectPayload};
use bitmessage_core::pow::{MultiThreadedPowEngine, ProofOfWorkEngine, SimplePowEngine};
use bitmessage_core::{
    export_wif, unix_time_plus, BitmessageAddress, Command, Config, Cryptography,
    ObjectMessage, Opt, PrivateKey, Secp256k1Cryptography, DOES_ACK,
};
use clap::Parser;
use data_encoding::HEXLOWER;
use log::{error, info, LevelFilter};
use std::process;
use std::sync::{mpsc, Arc};
use std::time::Instant;

/// Object type used for the proof of work demo; not a protocol type
const SAMPLE_OBJECT_TYPE: u32 = 0x4242;

fn main() {
    env_logger::builder().filter_level(LevelFilter::Info).init();

    let opt = Opt::parse();

    if let Err(e) = run(opt) {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn run(opt: Opt) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &opt.config {
        Some(path) => Config::load(path)?,
        None => Config::new()?,
    };
    let crypto: Arc<dyn Cryptography> = Arc::new(Secp256k1Cryptography::new());

    match opt.command {
        Command::NewAddress { stream, shorter } => {
            let key = PrivateKey::random(
                crypto.as_ref(),
                shorter,
                stream,
                config.nonce_trials_per_byte,
                config.extra_bytes,
                DOES_ACK,
            )?;
            print_identity(crypto.as_ref(), key)?;
        }
        Command::Deterministic {
            passphrase,
            count,
            version,
            stream,
            shorter,
        } => {
            let keys = PrivateKey::deterministic(
                crypto.as_ref(),
                &passphrase,
                count,
                version,
                stream,
                shorter,
            )?;
            for key in keys {
                let address = BitmessageAddress::from_private_key(crypto.as_ref(), key)?;
                println!("{address}");
            }
        }
        Command::Inspect { address } => {
            let address = BitmessageAddress::parse(crypto.as_ref(), &address)?;
            println!("Address: {address}");
            println!("Version: {}", address.version());
            println!("Stream:  {}", address.stream());
            println!("Ripe:    {}", HEXLOWER.encode(address.ripe()));
            if let Some(tag) = address.tag() {
                println!("Tag:     {}", HEXLOWER.encode(tag));
            }
        }
        Command::ExportWif {
            passphrase,
            version,
            stream,
        } => {
            let mut keys =
                PrivateKey::deterministic(crypto.as_ref(), &passphrase, 1, version, stream, false)?;
            let key = keys
                .pop()
                .ok_or("Deterministic derivation returned no identity")?;
            print_identity(crypto.as_ref(), key)?;
        }
        Command::Solve {
            data,
            nonce_trials_per_byte,
            extra_bytes,
            simple,
        } => {
            let nonce_trials_per_byte =
                nonce_trials_per_byte.unwrap_or(config.nonce_trials_per_byte);
            let extra_bytes = extra_bytes.unwrap_or(config.extra_bytes);
            let mut object = ObjectMessage::new(
                ObjectPayload::Generic(GenericPayload::new(
                    SAMPLE_OBJECT_TYPE,
                    1,
                    config.streams[0],
                    data.into_bytes(),
                )),
                unix_time_plus(config.ttl),
            );

            let engine: Box<dyn ProofOfWorkEngine> = if simple {
                Box::new(SimplePowEngine::new(Arc::clone(&crypto)))
            } else if config.pow_threads > 0 {
                Box::new(MultiThreadedPowEngine::with_threads(
                    Arc::clone(&crypto),
                    config.pow_threads,
                ))
            } else {
                Box::new(MultiThreadedPowEngine::new(Arc::clone(&crypto)))
            };

            let target =
                crypto.proof_of_work_target(&object, nonce_trials_per_byte, extra_bytes)?;
            info!("Solving for target {target}");
            let started = Instant::now();
            let (sender, receiver) = mpsc::channel();
            crypto.do_proof_of_work(
                &object,
                nonce_trials_per_byte,
                extra_bytes,
                engine.as_ref(),
                Box::new(move |_, nonce| {
                    let _ = sender.send(nonce);
                }),
            )?;
            let nonce = receiver.recv()?;
            object.set_nonce(nonce);
            crypto.check_proof_of_work(&object, nonce_trials_per_byte, extra_bytes)?;

            println!("Nonce:     {}", u64::from_be_bytes(nonce));
            println!("Inventory: {}", object.inventory_vector(crypto.as_ref())?);
            println!("Took:      {:.2?}", started.elapsed());
        }
    }
    Ok(())
}

fn print_identity(crypto: &dyn Cryptography, key: PrivateKey) -> Result<(), Box<dyn std::error::Error>> {
    let signing = export_wif(crypto, key.private_signing_key());
    let encryption = export_wif(crypto, key.private_encryption_key());
    let address = BitmessageAddress::from_private_key(crypto, key)?;
    println!("Address:        {address}");
    println!("Signing key:    {signing}");
    println!("Encryption key: {encryption}");
    Ok(())
}
