use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Aggregate, Book, BookEvent, BusConfig, CommandBus, CreateBook, DomainEvent, Money, Order,
    UpdateBookPrice, book::BookPriceUpdatedData,
};
use event_store::{EventEnvelope, EventStore, InMemoryEventStore, LoadedStream, Version};

fn bus() -> CommandBus<InMemoryEventStore> {
    CommandBus::builder(InMemoryEventStore::new())
        .config(BusConfig::default())
        .register::<Book>()
        .register::<Order>()
        .build()
        .unwrap()
}

fn create_book(id: AggregateId) -> CreateBook {
    CreateBook {
        book_id: id,
        isbn: "978-0201633610".to_string(),
        title: "Design Patterns".to_string(),
        description: String::new(),
        price: Money::from_cents(5499),
    }
}

fn bench_create_book(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = bus();

    c.bench_function("domain/dispatch_create_book", |b| {
        b.iter(|| {
            rt.block_on(async {
                bus.dispatch(create_book(AggregateId::generate()).into())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_update_price(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let bus = bus();
    let id = AggregateId::new("B-1");
    rt.block_on(async { bus.dispatch(create_book(id.clone()).into()).await.unwrap() });
    let mut price = 5499;

    c.bench_function("domain/dispatch_update_price", |b| {
        b.iter(|| {
            price += 1;
            rt.block_on(async {
                bus.dispatch(UpdateBookPrice::new(id.clone(), Money::from_cents(price)).into())
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_rehydrate_book(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryEventStore::new();
    let id = AggregateId::new("B-1");

    let mut events = Vec::new();
    let created = BookEvent::BookCreated(domain::book::BookCreatedData {
        book_id: id.clone(),
        isbn: "978-0201633610".to_string(),
        title: "Design Patterns".to_string(),
        description: String::new(),
        price: Money::from_cents(1000),
    });
    events.push(created);
    for n in 1..1000 {
        events.push(BookEvent::BookPriceUpdated(BookPriceUpdatedData {
            book_id: id.clone(),
            old_price: Money::from_cents(1000 + n - 1),
            new_price: Money::from_cents(1000 + n),
        }));
    }
    let envelopes: Vec<_> = events
        .iter()
        .enumerate()
        .map(|(i, event)| {
            EventEnvelope::builder()
                .aggregate_id(id.clone())
                .aggregate_type("Book")
                .event_type(event.event_type())
                .version(Version::new(i as u64 + 1))
                .payload(event)
                .unwrap()
                .build()
                .unwrap()
        })
        .collect();
    rt.block_on(async { store.append(&id, Version::initial(), envelopes).await.unwrap() });
    let stream: LoadedStream = rt.block_on(async { store.load_stream(&id).await.unwrap() });

    c.bench_function("domain/rehydrate_book_1000_events", |b| {
        b.iter(|| {
            let book = Book::from_stream(&stream).unwrap();
            assert_eq!(book.version(), Version::new(1000));
        });
    });
}

criterion_group!(
    benches,
    bench_create_book,
    bench_update_price,
    bench_rehydrate_book,
);
criterion_main!(benches);
