//! Deterministic synthetic movement history for demo runs.
//!
//! Background noise is spread evenly across stores, SKUs and operators.
//! A handful of planted patterns guarantee that every detector has
//! something to find regardless of the seed.

use anyhow::Result;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use retail_fraud_core::{
    movement::{MovementCategory, RawMovement},
    store::SqliteMovementStore,
};

const STORES: u32 = 6;
const SKUS: u32 = 120;
const ACTORS: u32 = 400;

struct DemoRng {
    inner: Pcg64Mcg,
}

impl DemoRng {
    fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }

    fn below(&mut self, n: u32) -> u32 {
        self.inner.gen_range(0..n)
    }

    fn chance(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p)
    }

    fn date(&mut self) -> String {
        format!(
            "{:02}/{:02}/2024 {:02}:{:02}",
            1 + self.below(28),
            1 + self.below(12),
            8 + self.below(12),
            self.below(60)
        )
    }

    fn value(&mut self) -> String {
        let cents = 500 + self.below(250_000);
        let reais = cents / 100;
        if reais >= 1000 {
            format!("R$ {}.{:03},{:02}", reais / 1000, reais % 1000, cents % 100)
        } else {
            format!("R$ {reais},{:02}", cents % 100)
        }
    }
}

fn row(
    rng: &mut DemoRng,
    id: usize,
    sku: String,
    store: String,
    actor: String,
    subtype: &str,
    date: String,
) -> RawMovement {
    RawMovement {
        source_id: Some(format!("DEMO-{id:06}")),
        sku: Some(sku),
        store: Some(store),
        actor: Some(actor),
        subtype: Some(subtype.to_string()),
        value_text: Some(rng.value()),
        date_text: Some(date),
    }
}

/// Insert roughly `rows` movements. Returns the number inserted.
pub fn populate(store: &SqliteMovementStore, rows: usize, seed: u64) -> Result<usize> {
    let mut rng = DemoRng::new(seed);
    let mut returns = Vec::new();
    let mut cancellations = Vec::new();
    let mut adjustments = Vec::new();

    for id in 0..rows {
        let sku = format!("SKU-{:04}", rng.below(SKUS));
        let shop = format!("L{:02}", 1 + rng.below(STORES));
        let actor = format!("CLI-{:05}", rng.below(ACTORS));
        let date = rng.date();
        match rng.below(10) {
            0..=5 => {
                let subtype = if rng.chance(0.08) { "TROCA" } else { "DEVOLUCAO" };
                returns.push(row(&mut rng, id, sku, shop, actor, subtype, date));
            }
            6..=7 => {
                cancellations.push(row(&mut rng, id, sku, shop, actor, "CANCELAMENTO", date))
            }
            _ => {
                let operator = format!("OP-{:02}", rng.below(8));
                adjustments.push(row(&mut rng, id, sku, shop, operator, "SAIDA", date));
            }
        }
    }

    // Planted patterns.
    let mut id = rows;
    for i in 0..40u32 {
        let actor = format!("CLI-{:05}", ACTORS + i % 3);
        returns.push(row(&mut rng, id, "SKU-9999".into(), "L99".into(), actor, "TROCA", planted_date(i)));
        id += 1;
    }
    adjustments.push(row(&mut rng, id, "SKU-9999".into(), "L99".into(), "OP-99".into(), "SAIDA", planted_date(0)));

    let mut inserted = 0;
    inserted += store.insert_batch(MovementCategory::Return, &returns)?;
    inserted += store.insert_batch(MovementCategory::Cancellation, &cancellations)?;
    inserted += store.insert_batch(MovementCategory::StockAdjustment, &adjustments)?;

    log::info!(
        "Demo data (seed {seed}): {} returns, {} cancellations, {} stock adjustments",
        returns.len(),
        cancellations.len(),
        adjustments.len()
    );
    Ok(inserted)
}

/// Planted rows cluster in early March, a few hours apart.
fn planted_date(i: u32) -> String {
    format!("{:02}/03/2024 {:02}:00", 1 + i / 8, 9 + i % 8)
}
