/// Product offered to a client by a push notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Product {
    pub name: &'static str,
    pub benefit: &'static str,
    /// Behavioral signals that make the product a good fit.
    pub signal: &'static str,
}

pub const PREMIUM_CARD: &str = "Премиальная карта";

const STANDARD_PRODUCTS: &[Product] = &[
    Product {
        name: "Карта для путешествий",
        benefit: "кешбэк на поездки/такси.",
        signal: "Путешествия/Отели/Такси, fx_buy/fx_sell",
    },
    Product {
        name: PREMIUM_CARD,
        benefit: "до 4% кешбэк + бонусы на рестораны/ювелирку/косметику.",
        signal: "высокий баланс, частые atm_withdrawal и p2p_out, активные рестораны/косметика/ювелирка",
    },
    Product {
        name: "Кредитная карта",
        benefit: "до 10% кешбэк, льготный период, рассрочка.",
        signal: "выраженные категории трат, онлайн-сервисы.",
    },
    Product {
        name: "Обмен валют",
        benefit: "экономия на спреде.",
        signal: "fx_buy/fx_sell.",
    },
    Product {
        name: "Кредит наличными",
        benefit: "быстрые деньги, гибкие погашения.",
        signal: "низкий баланс, регулярные loan_payment_out.",
    },
    Product {
        name: "Депозит мультивалютный",
        benefit: "проценты + хранение валют.",
        signal: "Большой баланс, fx_buy, fx_sell, deposit_fx_topup_out, deposit_fx_withdraw_in",
    },
    Product {
        name: "Депозит сберегательный",
        benefit: "максимальная ставка.",
        signal: "крупный стабильный остаток.",
    },
    Product {
        name: "Депозит накопительный",
        benefit: "повышенная ставка, пополнения без снятий.",
        signal: "средний баланс.",
    },
    Product {
        name: "Инвестиции (брокерский счёт)",
        benefit: "низкий порог, сниженные комиссии.",
        signal: "Огромный баланс.",
    },
    Product {
        name: "Золотые слитки",
        benefit: "защитный актив.",
        signal: "gold_buy_out, gold_sell_in.",
    },
];

/// Static, ordered reference list shared by every prompt of a run.
#[derive(Debug, Clone, Copy)]
pub struct ProductCatalog {
    products: &'static [Product],
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl ProductCatalog {
    pub const fn standard() -> Self {
        Self {
            products: STANDARD_PRODUCTS,
        }
    }

    pub fn products(&self) -> &'static [Product] {
        self.products
    }

    pub fn find(&self, name: &str) -> Option<&'static Product> {
        let name = name.trim();
        self.products.iter().find(|p| p.name == name)
    }

    /// Numbered, human-readable listing embedded verbatim in prompts.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, p) in self.products.iter().enumerate() {
            out.push_str(&format!(
                "{}. {}\n{}\nСигнал: {}\n",
                i + 1,
                p.name,
                p.benefit,
                p.signal
            ));
        }
        out
    }
}
