use crate::domain::catalog::{ProductCatalog, PREMIUM_CARD};
use crate::domain::profile::ClientProfile;
use crate::domain::recommendation::{FIELD_CLIENT_CODE, FIELD_PRODUCT, FIELD_PUSH};
use anyhow::Context;

/// Reference average balance the model compares client balances against.
pub const BASELINE_BALANCE: f64 = 600_000.0;

pub const PREMIUM_STATUS: &str = "Премиальный клиент";
pub const YOUNG_AGE_BELOW: i64 = 30;
pub const SENIOR_AGE_ABOVE: i64 = 50;
pub const PUSH_MIN_CHARS: usize = 180;
pub const PUSH_MAX_CHARS: usize = 200;

/// Renders one batch into the instruction sent to the model.
///
/// Deterministic: the same profiles in the same order always produce the same text.
pub fn compile_prompt(
    profiles: &[ClientProfile],
    catalog: &ProductCatalog,
    baseline_balance: f64,
) -> anyhow::Result<String> {
    let clients_json =
        serde_json::to_string_pretty(profiles).context("failed to serialize client profiles")?;

    Ok(format!(
        "Ты — рекомендательная система банка.\n\
На вход даны данные клиентов: топ-категории расходов, типы переводов, средний баланс, статус и возраст.\n\
Задача: для каждого клиента выбрать ровно 1 наиболее подходящий продукт и написать персональное push-уведомление.\n\
Среднестатистический баланс: {baseline_balance:.0}\n\
\n\
Продукты:\n\
{catalog}\
\n\
Клиенты (JSON):\n\
{clients_json}\n\
\n\
Ответ — строго JSON-список, без какого-либо текста до или после него. Сигналы клиента в ответ не включай:\n\
[\n  {{\n    \"{FIELD_CLIENT_CODE}\": <client_code>,\n    \"{FIELD_PRODUCT}\": \"<название продукта>\",\n    \"{FIELD_PUSH}\": \"<текст уведомления>\"\n  }}\n]\n\
\n\
Правила (соблюдай строго):\n\
- Ровно один объект на каждого клиента из входных данных.\n\
- В {FIELD_PRODUCT} только полное название продукта из списка выше.\n\
- В {FIELD_PUSH} поздоровайся с клиентом по имени и предложи продукт тремя короткими предложениями так, чтобы заинтересовать.\n\
- Обращайся к клиенту только на «вы».\n\
- Длина {FIELD_PUSH}: {PUSH_MIN_CHARS}-{PUSH_MAX_CHARS} символов.\n\
- В конце — призыв к действию: глагол в начальной форме, 1-2 слова, и точка. Заканчивай только точкой.\n\
- Если статус клиента «{PREMIUM_STATUS}», продукт «{PREMIUM_CARD}» не предлагай: выбери другой по его тратам и переводам.\n\
- Если клиенту меньше {YOUNG_AGE_BELOW} лет, сделай уведомление эмоциональным и энергичным.\n\
- Если клиенту больше {SENIOR_AGE_ABOVE} лет, сделай уведомление более серьёзным и сдержанным.\n",
        catalog = catalog.render(),
    ))
}
