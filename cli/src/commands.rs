//! Command implementations.

use std::io::Write;
use std::sync::Arc;

use anyhow::anyhow;
use pgpkit_common::{CreationFlag, CreationFlags, DeletionFlag, DeletionFlags, Result};
use pgpkit_engine::{Context, FixedPinentry, Key};
use tracing::info;

/// What `genrandom` prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RandomRequest {
    Number(u32),
    Bytes(usize),
    ZBase32,
}

/// Options of `createkey`.
#[derive(Debug, Clone, Default)]
pub struct KeyRequest {
    pub add_subkey: bool,
    pub certify: bool,
    pub sign: bool,
    pub encrypt: bool,
    pub authenticate: bool,
    pub group: bool,
    pub unprotected: bool,
    pub force: bool,
    pub no_expire: bool,
    pub expires: u64,
    pub algorithm: String,
    pub passphrase: Option<String>,
    pub target: String,
}

impl KeyRequest {
    pub fn flags(&self) -> CreationFlags {
        let mut flags = CreationFlags::new();
        flags
            .set_to(CreationFlag::Certify, self.certify)
            .set_to(CreationFlag::Sign, self.sign)
            .set_to(CreationFlag::Encrypt, self.encrypt)
            .set_to(CreationFlag::Authenticate, self.authenticate)
            .set_to(CreationFlag::Group, self.group)
            .set_to(CreationFlag::NoPassword, self.unprotected)
            .set_to(CreationFlag::Force, self.force)
            .set_to(CreationFlag::NoExpire, self.no_expire);
        flags
    }
}

/// Options of `deletekey`.
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub secret: bool,
    pub force: bool,
    pub pattern: String,
}

impl DeleteRequest {
    pub fn flags(&self) -> DeletionFlags {
        let mut flags = DeletionFlags::new();
        flags
            .set_to(DeletionFlag::AllowSecret, self.secret)
            .set_to(DeletionFlag::Force, self.force);
        flags
    }
}

/// Turn an engine result into a command result. A canceled operation
/// yields `None` and is not reported.
pub fn check<T>(what: &str, result: Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_canceled() => {
            info!(operation = what, "Canceled");
            Ok(None)
        }
        Err(e) => Err(anyhow!("Failed to {}: {}", what, e)),
    }
}

pub fn genrandom(ctx: &Context, request: &RandomRequest, out: &mut impl Write) -> anyhow::Result<()> {
    match *request {
        RandomRequest::Number(limit) => {
            if let Some(value) = check("generate random value", ctx.generate_random_value(limit))? {
                writeln!(out, "{}", value)?;
            }
        }
        RandomRequest::Bytes(count) => {
            if let Some(bytes) = check("generate random bytes", ctx.generate_random_bytes(count))? {
                writeln!(out, "{}", hex::encode(bytes))?;
            }
        }
        RandomRequest::ZBase32 => {
            if let Some(text) = check(
                "generate random z-base-32 string",
                ctx.generate_random_zbase32_string(),
            )? {
                writeln!(out, "{}", text)?;
            }
        }
    }
    Ok(())
}

pub fn createkey(ctx: &Context, request: &KeyRequest, out: &mut impl Write) -> anyhow::Result<()> {
    if let Some(passphrase) = &request.passphrase {
        ctx.set_pinentry(Arc::new(FixedPinentry::new(passphrase.clone())));
    }
    let flags = request.flags();

    let result = if request.add_subkey {
        let Some(key) = check("find key", ctx.key(&request.target, true))? else {
            return Ok(());
        };
        check(
            "create subkey",
            ctx.create_subkey(&key, &request.algorithm, request.expires, flags),
        )?
    } else {
        check(
            "create key",
            ctx.create_key(&request.target, &request.algorithm, request.expires, flags),
        )?
    };
    let Some(result) = result else {
        return Ok(());
    };

    let what = if result.primary { "key" } else { "subkey" };
    writeln!(out, "Created {} {}", what, result.fingerprint)?;
    if let Ok(key) = ctx.key(&result.fingerprint, false) {
        write!(out, "{}", key)?;
    }
    Ok(())
}

pub fn listkeys(
    ctx: &Context,
    pattern: Option<&str>,
    secret_only: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    let keys: Vec<Key> = match pattern {
        Some(pattern) => check("find key", ctx.key(pattern, secret_only))?
            .into_iter()
            .collect(),
        None => check("list keys", ctx.keys())?
            .unwrap_or_default()
            .into_iter()
            .filter(|key| !secret_only || key.has_secret())
            .collect(),
    };

    for key in keys {
        writeln!(out, "{}", key)?;
    }
    Ok(())
}

pub fn deletekey(ctx: &Context, request: &DeleteRequest, out: &mut impl Write) -> anyhow::Result<()> {
    let Some(key) = check("find key", ctx.key(&request.pattern, false))? else {
        return Ok(());
    };
    if check("delete key", ctx.delete_key(&key, request.flags()))?.is_some() {
        writeln!(out, "Deleted {}", key.fingerprint)?;
    }
    Ok(())
}
