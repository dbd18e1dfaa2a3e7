//! Offline provider that answers every question with the same reply.
//!
//! The reply is static content (a Kinyarwanda answer about foods that boost
//! energy) and the input is ignored. Useful for demos and for running the UI
//! without any model available.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ProviderFailure;
use crate::provider::{ProviderRequest, ResponseProvider};

pub const CANNED_REPLY: &str = "\
Nkurikije ibyo nzi, hari ibiribwa bimwe byakongera **imbaraga**, harimo:

* **Amashaza**: Akungahaza ku butare bwa zinc, bukaba ari ingenzi mu gutera akanyabugabo
* **Ibinyomoro (avocado)**: Birimo amavuta meza ndetse n'ibinyasukari bikenewe
* **Amavuta y'ibihwagari (olive oil)**: Akora ku buzima bw'imyanya ndangagitsina
* **Ibiryo birimo poroteyine nyinshi**: Nka poroteyine zituruka ku nyama, amafi, no mu byokurya by'ibihwagari (nut butter)
* **Ibinyomoro**: Nka avokado, ibinyomoro by'icyatsi, na karoti
* **Inyama z'inyoni**: Nka inkoko, zifite poroteyine nyinshi

Ni byiza kurya ibiribwa bitandukanye kugirango ugire **ubuzima bwiza** no kugira **akanyabugabo**. Uramutse ufite ibindi bibazo, ndahari kugufasha!
";

#[derive(Clone)]
pub struct CannedProvider {
    delay: Duration,
    reply: String,
}

impl CannedProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            reply: CANNED_REPLY.to_string(),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }
}

#[async_trait]
impl ResponseProvider for CannedProvider {
    async fn respond(&self, _request: &ProviderRequest) -> Result<String, ProviderFailure> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.reply.clone())
    }

    fn name(&self) -> String {
        "Canned".to_string()
    }
}
